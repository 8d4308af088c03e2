// Example reading a single-object error body with the field accessors

use picoresponse::{Config, Response, SliceTransport};

fn main() {
    println!("Error body demo");
    println!("===============");

    let raw = b"HTTP/1.1 404 Not Found\r\n\
Content-Type: application/json\r\n\
Content-Length: 52\r\n\
\r\n\
{\"code\":101,\r\n\"error\":\"object not found for update\"}";

    // A caller-owned buffer: nothing is allocated for the body
    let mut buffer = [0u8; 96];
    let transport = SliceTransport::new(raw, 16);
    let mut response = Response::with_config(transport, Config::default().with_timeout_ms(100));
    response.set_buffer(&mut buffer);

    response.read_with_timeout(1);
    println!("Status ok: {}", response.is_ok());
    println!(
        "Body: {}",
        core::str::from_utf8(response.json_body()).unwrap_or("<binary>")
    );
    println!("Error code: {}", response.error_code());
    println!("Message: {}", response.get_string("error"));
}
