//! Terminal prompt for the Withings authorization code

use crate::core::auth::CodeProvider;
use crate::domain::Result;
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// Prints the authorize URL and reads one line from stdin
///
/// End of input means nobody is at the terminal.
#[derive(Debug, Default)]
pub struct StdinCodeProvider;

#[async_trait]
impl CodeProvider for StdinCodeProvider {
    async fn provide_code(&self, authorize_url: &str) -> Result<Option<String>> {
        let mut stdout = tokio::io::stdout();
        let banner = format!(
            "\n🔑 Withings authorization required\n   Open this URL in a browser and approve access:\n\n   {authorize_url}\n\n   Paste the code or the full redirect URL: "
        );
        stdout.write_all(banner.as_bytes()).await?;
        stdout.flush().await?;

        let mut line = String::new();
        let read = BufReader::new(tokio::io::stdin())
            .read_line(&mut line)
            .await?;

        Ok(parse_line(read, &line))
    }
}

fn parse_line(read: usize, line: &str) -> Option<String> {
    if read == 0 {
        return None;
    }
    let trimmed = line.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line() {
        assert_eq!(parse_line(0, ""), None);
        assert_eq!(parse_line(1, "\n"), None);
        assert_eq!(parse_line(8, "  abc12\n"), Some("abc12".to_string()));
    }
}
