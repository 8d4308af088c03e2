// SPDX-License-Identifier: Apache-2.0

// Walks a canned chunked response the way a device would read it off a socket.
// Run with RUST_LOG=debug to see the header scan and chunk boundaries.

use picoresponse::{Config, FlatFields, Response, SliceTransport};

const RESPONSE: &[u8] = b"HTTP/1.1 200 OK\r\n\
Content-Type: application/json\r\n\
Transfer-Encoding: chunked\r\n\
\r\n\
2e\r\n\
{\"results\":[{\"objectId\":\"a1\",\"score\":1337,\"che\r\n\
54\r\n\
ater\":false},{\"objectId\":\"b2\",\"score\":42,\"cheater\":true},{\"objectId\":\"c3\",\"score\":7,\r\n\
1c\r\n\
\"cheater\":false,\"tags\":[]}]}\r\n\
0\r\n\
\r\n";

fn main() {
    env_logger::init();

    println!("picoresponse demo: chunked results");
    println!("==================================");

    // 32-byte window and 8-byte reads, far smaller than the chunks
    let transport = SliceTransport::new(RESPONSE, 8);
    let config = Config::default().with_buffer_size(128);
    let mut response: Response<'_, _, FlatFields, 32> =
        Response::with_lookup(transport, config, FlatFields);

    let count = response.count();
    println!("Status ok: {}", response.is_ok());
    println!("Estimated results: {}", count.as_raw());
    println!();

    let mut seen = 0;
    while response.next_object() {
        seen += 1;
        let id = response.get_string("objectId").to_string();
        let score = response.get_int("score");
        let cheater = response.get_boolean("cheater");
        println!("  #{seen} objectId={id} score={score} cheater={cheater}");
    }

    println!();
    println!("Iterated {seen} results");
    log::info!("Estimate was {}, actual {seen}", count.as_raw());
    response.close();
}
