//! Server-Sent Events (SSE) processing for streaming responses.
//!
//! This module turns the raw byte stream of `POST /api/chat/stream` into a
//! sequence of [`StreamEvent`]s. Frames look like `data: <json>\n\n` and may
//! be split across chunk boundaries in arbitrary ways, so undecoded text is
//! carried over between chunks and only complete lines are processed. The
//! event sequence is independent of how the bytes were chunked.

use std::collections::VecDeque;

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;

use crate::observability::{STREAM_CHUNKS, STREAM_DROPPED_FRAMES, STREAM_EVENTS};
use crate::{CostInfo, Error, FinishReason, Result, StreamEvent};

/// The wire shape of a single frame payload.
///
/// Classification precedence: `error`, then `done`, then `token`. The
/// terminal frame carries `token: ""` alongside `done: true`, so `done`
/// must win over `token`.
#[derive(Debug, Deserialize)]
struct Frame {
    error: Option<String>,
    done: Option<bool>,
    token: Option<String>,
    model: Option<String>,
    finish_reason: Option<FinishReason>,
    cost: Option<CostInfo>,
}

/// Decoder state threaded through the unfold.
struct Decoder<S> {
    stream: S,
    /// Trailing bytes of the previous chunk that did not end on a UTF-8
    /// character boundary.
    carry: Vec<u8>,
    buffer: String,
    ready: VecDeque<StreamEvent>,
    terminated: bool,
}

/// Process a stream of bytes into a stream of protocol events.
///
/// The input items are already this crate's `Result` so that transports can
/// map their own read errors before decoding. The output terminates after a
/// `Done` event even if more bytes follow.
pub fn decode_sse<S>(byte_stream: S) -> impl Stream<Item = Result<StreamEvent>>
where
    S: Stream<Item = Result<Bytes>> + Unpin,
{
    let decoder = Decoder {
        stream: byte_stream,
        carry: Vec::new(),
        buffer: String::new(),
        ready: VecDeque::new(),
        terminated: false,
    };

    stream::unfold(decoder, move |mut decoder| async move {
        loop {
            if let Some(event) = decoder.ready.pop_front() {
                STREAM_EVENTS.click();
                return Some((Ok(event), decoder));
            }
            if decoder.terminated {
                return None;
            }

            match decoder.stream.next().await {
                Some(Ok(bytes)) => {
                    STREAM_CHUNKS.click();
                    if let Err(e) = append_chunk(&mut decoder, &bytes) {
                        return Some((Err(e), decoder));
                    }
                    drain_complete_lines(&mut decoder);
                }
                Some(Err(e)) => {
                    return Some((Err(e), decoder));
                }
                None => {
                    // End of stream: a final frame may lack its trailing
                    // newline. Bytes of a character cut off mid-stream are
                    // dropped along with the partial frame they belong to.
                    decoder.carry.clear();
                    let rest = std::mem::take(&mut decoder.buffer);
                    if !rest.is_empty() {
                        enqueue_line(&mut decoder, &rest);
                    }
                    decoder.terminated = true;
                }
            }
        }
    })
}

/// Decodes a chunk into the text buffer, holding back a trailing
/// incomplete UTF-8 sequence for the next chunk. A sequence that is
/// invalid outright is fatal.
fn append_chunk<S>(decoder: &mut Decoder<S>, bytes: &[u8]) -> Result<()> {
    decoder.carry.extend_from_slice(bytes);
    match std::str::from_utf8(&decoder.carry) {
        Ok(text) => {
            decoder.buffer.push_str(text);
            decoder.carry.clear();
        }
        Err(e) if e.error_len().is_none() => {
            let valid = e.valid_up_to();
            decoder
                .buffer
                .push_str(std::str::from_utf8(&decoder.carry[..valid]).expect("verified prefix"));
            decoder.carry.drain(..valid);
        }
        Err(e) => {
            decoder.carry.clear();
            return Err(Error::encoding(
                format!("Invalid UTF-8 in stream: {e}"),
                Some(Box::new(e)),
            ));
        }
    }
    Ok(())
}

/// Splits the carry-over buffer on newlines, holding back the final
/// (possibly incomplete) fragment for the next chunk.
fn drain_complete_lines<S>(decoder: &mut Decoder<S>) {
    while !decoder.terminated {
        let Some(pos) = decoder.buffer.find('\n') else {
            break;
        };
        let line: String = decoder.buffer.drain(..=pos).collect();
        enqueue_line(decoder, &line);
    }
}

/// Parses one complete line and queues its event, if any.
///
/// A line without the `data: ` prefix, an empty payload, and a payload
/// whose JSON fails to parse are all dropped: individual frames may be
/// garbled without poisoning the stream. Only an `error` field inside a
/// frame that parses is fatal, and that is the controller's call.
fn enqueue_line<S>(decoder: &mut Decoder<S>, line: &str) {
    let line = line.trim_end_matches(['\r', '\n']);
    let Some(payload) = line.strip_prefix("data: ") else {
        return;
    };
    if payload.is_empty() {
        return;
    }
    let frame: Frame = match serde_json::from_str(payload) {
        Ok(frame) => frame,
        Err(_) => {
            STREAM_DROPPED_FRAMES.click();
            return;
        }
    };
    if let Some(message) = frame.error {
        decoder.ready.push_back(StreamEvent::Error { message });
        return;
    }
    if frame.done.unwrap_or(false) {
        decoder.ready.push_back(StreamEvent::Done {
            model: frame.model,
            finish_reason: frame.finish_reason,
            cost: frame.cost,
        });
        // Nothing after the terminal frame is decoded.
        decoder.terminated = true;
        decoder.buffer.clear();
        return;
    }
    if let Some(text) = frame.token {
        decoder.ready.push_back(StreamEvent::Token { text });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    async fn collect(chunks: Vec<&'static [u8]>) -> Vec<Result<StreamEvent>> {
        let byte_stream = stream::iter(
            chunks
                .into_iter()
                .map(|c| Ok(Bytes::from_static(c)))
                .collect::<Vec<_>>(),
        );
        Box::pin(decode_sse(byte_stream)).collect().await
    }

    fn events(results: Vec<Result<StreamEvent>>) -> Vec<StreamEvent> {
        results.into_iter().map(|r| r.unwrap()).collect()
    }

    const HELLO: &[u8] = b"data: {\"token\":\"Hel\"}\n\ndata: {\"token\":\"lo\"}\n\ndata: {\"token\":\"\",\"done\":true,\"model\":\"m1\",\"finish_reason\":\"stop\",\"cost\":{\"total_cost_rub\":0.5}}\n\n";

    fn hello_expected() -> Vec<StreamEvent> {
        vec![
            StreamEvent::Token {
                text: "Hel".to_string(),
            },
            StreamEvent::Token {
                text: "lo".to_string(),
            },
            StreamEvent::Done {
                model: Some("m1".to_string()),
                finish_reason: Some(FinishReason::Stop),
                cost: Some(CostInfo::new(0.5)),
            },
        ]
    }

    #[tokio::test]
    async fn single_chunk() {
        assert_eq!(events(collect(vec![HELLO]).await), hello_expected());
    }

    #[tokio::test]
    async fn chunk_boundary_independence() {
        // The same byte content split at every possible boundary must
        // produce the same event sequence.
        for split in 1..HELLO.len() {
            let (a, b) = HELLO.split_at(split);
            let got = events(collect(vec![a, b]).await);
            assert_eq!(got, hello_expected(), "split at {split}");
        }
    }

    #[tokio::test]
    async fn one_byte_chunks() {
        let chunks: Vec<&'static [u8]> = HELLO.chunks(1).collect();
        assert_eq!(events(collect(chunks).await), hello_expected());
    }

    #[tokio::test]
    async fn multiple_frames_in_one_chunk_emit_in_order() {
        let got = events(collect(vec![b"data: {\"token\":\"a\"}\n\ndata: {\"token\":\"b\"}\n\n"]).await);
        assert_eq!(
            got,
            vec![
                StreamEvent::Token {
                    text: "a".to_string()
                },
                StreamEvent::Token {
                    text: "b".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn malformed_frame_is_dropped() {
        let got = events(
            collect(vec![
                b"data: {\"token\":\"a\"}\n\ndata: {not json\n\ndata: {\"token\":\"b\"}\n\n",
            ])
            .await,
        );
        assert_eq!(
            got,
            vec![
                StreamEvent::Token {
                    text: "a".to_string()
                },
                StreamEvent::Token {
                    text: "b".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn empty_payload_and_non_data_lines_yield_nothing() {
        let got = events(collect(vec![b"data: \n\n: comment\n\nevent: ping\n\n"]).await);
        assert!(got.is_empty());
    }

    #[tokio::test]
    async fn error_frame_yields_error_event() {
        let got = events(collect(vec![b"data: {\"error\":\"rate limited\"}\n\n"]).await);
        assert_eq!(
            got,
            vec![StreamEvent::Error {
                message: "rate limited".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn done_terminates_the_sequence() {
        let got = events(
            collect(vec![
                b"data: {\"done\":true}\n\ndata: {\"token\":\"ignored\"}\n\n",
            ])
            .await,
        );
        assert_eq!(
            got,
            vec![StreamEvent::Done {
                model: None,
                finish_reason: None,
                cost: None,
            }]
        );
    }

    #[tokio::test]
    async fn final_frame_without_trailing_newline_is_flushed() {
        let got = events(collect(vec![b"data: {\"token\":\"tail\"}"]).await);
        assert_eq!(
            got,
            vec![StreamEvent::Token {
                text: "tail".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn read_error_propagates() {
        let byte_stream = stream::iter(vec![
            Ok(Bytes::from_static(b"data: {\"token\":\"a\"}\n\n")),
            Err(Error::streaming("connection reset", None)),
        ]);
        let got: Vec<_> = Box::pin(decode_sse(byte_stream)).collect().await;
        assert!(matches!(got[0], Ok(StreamEvent::Token { .. })));
        assert!(got[1].is_err());
    }

    #[tokio::test]
    async fn invalid_utf8_is_fatal() {
        let byte_stream = stream::iter(vec![Ok(Bytes::from_static(&[0xff, 0xfe]))]);
        let got: Vec<_> = Box::pin(decode_sse(byte_stream)).collect().await;
        assert!(matches!(got[0], Err(Error::Encoding { .. })));
    }

    #[tokio::test]
    async fn multibyte_character_split_across_chunks() {
        // "Привет" is two bytes per character in UTF-8; splitting anywhere
        // inside it must not corrupt the token.
        let frame = "data: {\"token\":\"Привет\"}\n\n".as_bytes();
        for split in 1..frame.len() {
            let (a, b) = frame.split_at(split);
            let byte_stream = stream::iter(vec![
                Ok(Bytes::copy_from_slice(a)),
                Ok(Bytes::copy_from_slice(b)),
            ]);
            let got: Vec<_> = Box::pin(decode_sse(byte_stream)).collect().await;
            assert_eq!(
                events(got),
                vec![StreamEvent::Token {
                    text: "Привет".to_string()
                }],
                "split at {split}"
            );
        }
    }

    #[tokio::test]
    async fn crlf_lines_are_tolerated() {
        let got = events(collect(vec![b"data: {\"token\":\"a\"}\r\n\r\n"]).await);
        assert_eq!(
            got,
            vec![StreamEvent::Token {
                text: "a".to_string()
            }]
        );
    }
}
