use tokio::io::{AsyncWrite, AsyncWriteExt as _};
use tokio::task::JoinHandle;

use crate::foundation::core::FrameBuffer;
use crate::foundation::error::{FlipbookError, FlipbookResult};

/// Drain per-frame producer handles in index order and write each buffer to `sink`.
///
/// Production may complete out of order; writing never does. Each `write_all` is awaited before
/// the next frame is touched, so the sink's backpressure throttles the writer. The first failed
/// frame or failed write stops the stream, and the sink is shut down in every case so a consumer
/// on the other end sees end-of-input. Returns the number of bytes streamed.
pub async fn stream_frames<W>(
    mut sink: W,
    handles: Vec<JoinHandle<FlipbookResult<FrameBuffer>>>,
) -> FlipbookResult<u64>
where
    W: AsyncWrite + Unpin,
{
    let mut streamed = 0u64;
    let mut failure = None;
    for (index, handle) in handles.into_iter().enumerate() {
        let frame = index as u64 + 1;
        match await_frame(handle, frame).await {
            Ok(buffer) => {
                if let Err(e) = sink.write_all(&buffer).await {
                    failure = Some(FlipbookError::stream_write(format!("frame {frame}: {e}")));
                    break;
                }
                streamed += buffer.len() as u64;
            }
            Err(err) => {
                failure = Some(err);
                break;
            }
        }
    }

    // Close the stream even after a failure, otherwise the consumer waits on input forever.
    let closed = sink.shutdown().await;
    if let Some(err) = failure {
        return Err(err);
    }
    closed.map_err(|e| FlipbookError::stream_write(format!("closing frame stream: {e}")))?;
    Ok(streamed)
}

async fn await_frame(
    handle: JoinHandle<FlipbookResult<FrameBuffer>>,
    frame: u64,
) -> FlipbookResult<FrameBuffer> {
    match handle.await {
        Ok(result) => result,
        Err(e) => Err(FlipbookError::render(format!("frame {frame}: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use std::time::Duration;

    #[tokio::test]
    async fn frames_are_written_in_index_order_despite_completion_order() {
        let mut handles = Vec::new();
        for frame in 1..=4u8 {
            handles.push(tokio::spawn(async move {
                // Earlier frames finish last.
                tokio::time::sleep(Duration::from_millis((5 - u64::from(frame)) * 10)).await;
                Ok::<_, FlipbookError>(vec![frame; frame as usize])
            }));
        }

        let mut sink = Cursor::new(Vec::new());
        let streamed = stream_frames(&mut sink, handles).await.unwrap();

        assert_eq!(streamed, 10);
        assert_eq!(sink.into_inner(), vec![1, 2, 2, 3, 3, 3, 4, 4, 4, 4]);
    }

    #[tokio::test]
    async fn mid_stream_failure_stops_writing_and_still_closes_the_stream() {
        let handles = vec![
            tokio::spawn(async { Ok::<_, FlipbookError>(vec![9u8, 9]) }),
            tokio::spawn(async {
                Err::<FrameBuffer, _>(FlipbookError::render("injected render failure"))
            }),
            tokio::spawn(async { Ok::<_, FlipbookError>(vec![7u8]) }),
        ];

        let mut sink = RecordingSink::default();
        let err = stream_frames(&mut sink, handles).await.unwrap_err();

        assert!(err.to_string().contains("injected render failure"));
        assert_eq!(sink.data, vec![9, 9]);
        assert!(sink.shut_down);
    }

    #[tokio::test]
    async fn panicked_producer_fails_its_frame() {
        let handles: Vec<JoinHandle<FlipbookResult<FrameBuffer>>> =
            vec![tokio::spawn(async { panic!("boom") })];

        let mut sink = RecordingSink::default();
        let err = stream_frames(&mut sink, handles).await.unwrap_err();

        assert!(err.to_string().contains("frame 1"));
        assert!(sink.shut_down);
    }

    #[derive(Default)]
    struct RecordingSink {
        data: Vec<u8>,
        shut_down: bool,
    }

    impl AsyncWrite for RecordingSink {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<std::io::Result<usize>> {
            self.get_mut().data.extend_from_slice(buf);
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            self.get_mut().shut_down = true;
            Poll::Ready(Ok(()))
        }
    }
}
