use super::read_lines;
use crate::play::PlayVerifier;
use crate::Result;
use std::io::{Read, Write};

/// Copy package names from `input` to `output` if they are available on
/// Google Play
pub async fn package_filter<R: Read, W: Write>(
    input: R,
    mut output: W,
    verifier: &PlayVerifier,
    include_403: bool,
) -> Result<usize> {
    let mut available = 0;

    for package in read_lines(input)? {
        if verifier.is_package_in_play(&package, include_403).await? {
            writeln!(output, "{package}")?;
            available += 1;
        }
    }

    output.flush()?;
    Ok(available)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[tokio::test]
    async fn test_package_filter() {
        let mut server = mockito::Server::new_async().await;
        let mut mocks = Vec::new();
        for (package, status) in [("com.ok", 200), ("com.gone", 404), ("com.locked", 403)] {
            let mock = server
                .mock("HEAD", "/details")
                .match_query(Matcher::UrlEncoded("id".into(), package.into()))
                .with_status(status)
                .create_async()
                .await;
            mocks.push(mock);
        }

        let verifier = PlayVerifier::new(format!("{}/details", server.url()), 5).unwrap();
        let input = "com.ok\ncom.gone\ncom.locked\n";

        let mut output = Vec::new();
        package_filter(input.as_bytes(), &mut output, &verifier, false)
            .await
            .unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), "com.ok\n");

        let mut output = Vec::new();
        package_filter(input.as_bytes(), &mut output, &verifier, true)
            .await
            .unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), "com.ok\ncom.locked\n");
    }
}
