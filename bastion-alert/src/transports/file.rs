use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::{fs::OpenOptions, io::AsyncWriteExt, sync::Mutex};

use crate::{AlertError, AlertTransport};

/// Appends each alert as one JSON line to `<output_dir>/<topic>.jsonl`.
#[derive(Debug)]
pub struct FileTransport {
    output_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileTransport {
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Result<Self, AlertError> {
        let output_dir = output_dir.as_ref().to_path_buf();

        if !output_dir.exists() {
            std::fs::create_dir_all(&output_dir)?;
        }

        Ok(Self {
            output_dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn topic_path(&self, topic: &str) -> PathBuf {
        let file_name: String = topic
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.output_dir.join(format!("{file_name}.jsonl"))
    }
}

#[async_trait]
impl AlertTransport for FileTransport {
    async fn send(&self, topic: &str, payload: &[u8]) -> Result<(), AlertError> {
        let mut line = Vec::with_capacity(payload.len() + 1);
        line.extend_from_slice(payload);
        line.push(b'\n');

        // One writer at a time so lines never interleave
        let _guard = self.write_lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.topic_path(topic))
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;

        Ok(())
    }
}
