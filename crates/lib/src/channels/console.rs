//! Console channel: prints replies to stdout for the interactive `chat` command.

use crate::channels::registry::ChannelHandle;
use crate::channels::ChannelError;
use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

pub struct ConsoleChannel {
    id: String,
    out: Mutex<Box<dyn AsyncWrite + Send + Unpin>>,
}

impl Default for ConsoleChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleChannel {
    pub fn new() -> Self {
        Self::with_writer(Box::new(tokio::io::stdout()))
    }

    pub fn with_writer(out: Box<dyn AsyncWrite + Send + Unpin>) -> Self {
        Self {
            id: "console".to_string(),
            out: Mutex::new(out),
        }
    }
}

#[async_trait]
impl ChannelHandle for ConsoleChannel {
    fn id(&self) -> &str {
        &self.id
    }

    fn stop(&self) {}

    async fn send_message(&self, _conversation_id: &str, text: &str) -> Result<(), ChannelError> {
        let mut out = self.out.lock().await;
        out.write_all(format!("< {}\n", text.trim()).as_bytes()).await?;
        out.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn send_writes_prefixed_line() {
        let (writer, mut reader) = tokio::io::duplex(256);
        let console = ConsoleChannel::with_writer(Box::new(writer));
        console.send_message("local", "  hello there \n").await.unwrap();
        drop(console);
        let mut s = String::new();
        reader.read_to_string(&mut s).await.unwrap();
        assert_eq!(s, "< hello there\n");
    }
}
