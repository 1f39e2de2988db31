#![allow(dead_code)]

use crate::mux::error::{MuxError, Result};
use crate::mux::types::Message;
use serde::{Deserialize, Serialize};
use std::io::BufRead;

/// Wire form of a message: a two-entry map with short keys
#[derive(Serialize)]
struct FrameRef<'a> {
    #[serde(rename = "t")]
    tag: &'a str,
    #[serde(rename = "d")]
    data: &'a str,
}

#[derive(Deserialize)]
struct Frame {
    #[serde(rename = "t")]
    tag: String,
    #[serde(rename = "d")]
    data: String,
}

impl From<Frame> for Message {
    fn from(f: Frame) -> Self {
        Message {
            tag: f.tag,
            data: f.data,
        }
    }
}

/// Encode one tagged fragment as a self-delimiting frame
pub fn encode_frame(tag: &str, data: &str) -> Result<Vec<u8>> {
    let frame = FrameRef { tag, data };
    Ok(rmp_serde::to_vec_named(&frame)?)
}

/// Reads frames one at a time from a byte stream
pub struct FrameReader<R> {
    rd: R,
}

impl<R: BufRead> FrameReader<R> {
    pub fn new(rd: R) -> Self {
        Self { rd }
    }
}

impl<R: BufRead> Iterator for FrameReader<R> {
    type Item = Result<Message>;

    fn next(&mut self) -> Option<Self::Item> {
        // EOF is only clean on a frame boundary
        let at_end = match self.rd.fill_buf() {
            Ok(buf) => buf.is_empty(),
            Err(e) => return Some(Err(e.into())),
        };
        if at_end {
            return None;
        }

        Some(
            rmp_serde::from_read::<_, Frame>(&mut self.rd)
                .map(Message::from)
                .map_err(MuxError::from),
        )
    }
}

/// Decode a complete stream of concatenated frames, in arrival order
pub fn decode_messages(data: &[u8]) -> Result<Vec<Message>> {
    FrameReader::new(data).collect()
}

/// Concatenate fragments per tag, tags in order of first appearance
pub fn group_by_tag(messages: &[Message]) -> Vec<(String, String)> {
    let mut streams: Vec<(String, String)> = Vec::new();
    for msg in messages {
        match streams.iter_mut().find(|(tag, _)| *tag == msg.tag) {
            Some((_, data)) => data.push_str(&msg.data),
            None => streams.push((msg.tag.clone(), msg.data.clone())),
        }
    }
    streams
}
