//! Choose a decoder from the tag at the front of a serialized message.
//!
//! This example shows how to:
//! - Write an object's tag as a little-endian header with `write_tag`
//! - Read it back with `peek_tag` before anything else is decoded
//! - Dispatch on ancestry with the runtime `Hierarchy` (no object needed)

use tagcast::{hierarchy, peek_tag, write_tag, Instance, Node, Object, TagStore};

#[derive(Object)]
struct Message {
    #[object(tag)]
    tag: TagStore<u8>,
    id: u32,
}

#[derive(Object)]
struct Request {
    #[object(base)]
    message: Message,
}

#[derive(Object)]
struct Get {
    #[object(base)]
    request: Request,
    key: String,
}

#[derive(Object)]
struct Put {
    #[object(base)]
    request: Request,
    key: String,
    value: u64,
}

#[derive(Object)]
struct Reply {
    #[object(base)]
    message: Message,
    ok: bool,
}

hierarchy! {
    pub mod message_tags for Message {
        Request {
            Get;
            Put;
        }
        Reply;
    }
}

fn message<T: Node<Message>>(id: u32) -> Message {
    Message {
        // SAFETY: every caller embeds the result in a `T`.
        tag: unsafe { TagStore::of::<Message, T>() },
        id,
    }
}

fn encode_put(put: &Put) -> Vec<u8> {
    let mut out = Vec::new();
    write_tag(put.tag(), &mut out);
    out.extend_from_slice(&put.root().id.to_le_bytes());
    out.extend_from_slice(&put.value.to_le_bytes());
    out.extend_from_slice(put.key.as_bytes());
    out
}

fn encode_get(get: &Get) -> Vec<u8> {
    let mut out = Vec::new();
    write_tag(get.tag(), &mut out);
    out.extend_from_slice(&get.root().id.to_le_bytes());
    out.extend_from_slice(get.key.as_bytes());
    out
}

fn main() {
    let runtime = message_tags::hierarchy().expect("declared hierarchy is valid");

    let put = Put {
        request: Request {
            message: message::<Put>(7),
        },
        key: "answer".to_string(),
        value: 42,
    };
    let get = Get {
        request: Request {
            message: message::<Get>(8),
        },
        key: "answer".to_string(),
    };
    let reply = Reply {
        message: message::<Reply>(9),
        ok: true,
    };

    let mut reply_bytes = Vec::new();
    write_tag(reply.tag(), &mut reply_bytes);
    reply_bytes.push(reply.ok as u8);

    let frames = [encode_put(&put), encode_get(&get), reply_bytes, Vec::new()];

    for frame in &frames {
        let Some(tag) = peek_tag::<u8>(frame) else {
            println!("  empty frame");
            continue;
        };
        let name = runtime.name_of(u64::from(tag)).unwrap_or("?");
        let is_request = runtime.instance_of(u64::from(tag), "Request").unwrap_or(false);
        println!(
            "  tag {:#06b} → {:<8} request: {:<5} ({} bytes)",
            tag,
            name,
            is_request,
            frame.len()
        );
    }
}
