use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use std::io;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, error};

/// Streams an upload body to `path`, returning the number of bytes written.
///
/// The file is created fresh (an existing file is an error). On any stream
/// or write error the partially written file is removed before returning.
/// Stream errors come back with their original `io::ErrorKind`.
pub async fn stream_to_file<S, E>(stream: S, path: &Path) -> io::Result<u64>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Into<io::Error>,
{
    let file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;

    match write_all_chunks(stream, BufWriter::new(file)).await {
        Ok(written) => {
            debug!(path = %path.display(), bytes = written, "Upload persisted");
            Ok(written)
        }
        Err(e) => {
            error!(path = %path.display(), "Upload interrupted: {}", e);
            remove_partial(path).await;
            Err(e)
        }
    }
}

async fn write_all_chunks<S, E>(stream: S, mut writer: BufWriter<File>) -> io::Result<u64>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Into<io::Error>,
{
    let mut stream = std::pin::pin!(stream);
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(Into::<io::Error>::into)?;
        writer.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }

    writer.flush().await?;
    writer.into_inner().sync_all().await?;
    Ok(written)
}

async fn remove_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => error!(path = %path.display(), "Failed to remove partial upload: {}", e),
    }
}
