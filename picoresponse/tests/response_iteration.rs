// Walking results arrays end to end over plain and chunked bodies

use picoresponse::{Config, FlatFields, Response, ResultCount, SliceTransport, Transport};

use test_log::test;

const BODY: &[u8] = br#"{"results":[{"name":"alpha","score":1},  {"name":"beta","score":2,"tags":["x","y"]}, {"name":"gamma","score":3,"meta":{"ok":true}}]}"#;

const ELEMENTS: [&[u8]; 3] = [
    br#"{"name":"alpha","score":1}"#,
    br#"{"name":"beta","score":2,"tags":["x","y"]}"#,
    br#"{"name":"gamma","score":3,"meta":{"ok":true}}"#,
];

fn plain_response(body: &[u8]) -> Vec<u8> {
    let mut raw = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n",
        body.len()
    )
    .into_bytes();
    raw.extend_from_slice(body);
    raw
}

/// Encode `body` as chunks of the given sizes; whatever is left becomes the last chunk.
fn chunked_response(body: &[u8], sizes: &[usize]) -> Vec<u8> {
    let mut raw = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n".to_vec();
    let mut rest = body;
    for &size in sizes {
        if rest.is_empty() {
            break;
        }
        let (chunk, tail) = rest.split_at(size.clamp(1, rest.len()));
        raw.extend_from_slice(format!("{:x}\r\n", chunk.len()).as_bytes());
        raw.extend_from_slice(chunk);
        raw.extend_from_slice(b"\r\n");
        rest = tail;
    }
    if !rest.is_empty() {
        raw.extend_from_slice(format!("{:X}\r\n", rest.len()).as_bytes());
        raw.extend_from_slice(rest);
        raw.extend_from_slice(b"\r\n");
    }
    raw.extend_from_slice(b"0\r\n\r\n");
    raw
}

fn squeeze(bytes: &[u8]) -> Vec<u8> {
    bytes
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect()
}

fn collect_objects<const W: usize>(raw: &[u8], piece: usize) -> (ResultCount, Vec<Vec<u8>>) {
    let transport = SliceTransport::new(raw, piece);
    let mut response: Response<'_, _, FlatFields, W> =
        Response::with_lookup(transport, Config::default().with_timeout_ms(10), FlatFields);
    let count = response.count();
    let mut objects = Vec::new();
    while response.next_object() {
        objects.push(squeeze(response.fragment()));
    }
    (count, objects)
}

#[test]
fn test_three_elements_plain_body() {
    let raw = plain_response(BODY);
    let mut response = Response::new(SliceTransport::full_slice(&raw));

    let count = response.count();
    assert!(count.has_results());
    assert!(response.is_ok());

    for expected in ELEMENTS {
        assert!(response.next_object());
        assert_eq!(squeeze(response.fragment()), squeeze(expected));
    }
    assert!(!response.next_object());
    assert!(!response.next_object());
}

#[test]
fn test_count_estimate_from_first_element() {
    let raw = plain_response(BODY);
    let mut response = Response::new(SliceTransport::full_slice(&raw));
    let expected = BODY.len() / ELEMENTS[0].len();
    assert_eq!(response.count(), ResultCount::Estimated(expected));
    assert_eq!(response.count().as_raw(), expected as i32);
}

#[test]
fn test_count_estimate_doubled_when_chunked() {
    let raw = chunked_response(BODY, &[40]);
    let mut response = Response::new(SliceTransport::full_slice(&raw));
    let expected = 2 * (40 / ELEMENTS[0].len());
    assert_eq!(response.count(), ResultCount::Estimated(expected));
}

#[test]
fn test_count_floored_to_one() {
    let body = br#"{"results":[{"a":1}]}"#;
    let raw = chunked_response(body, &[3]);
    let mut response = Response::new(SliceTransport::full_slice(&raw));
    assert_eq!(response.count(), ResultCount::Estimated(1));
    assert!(response.next_object());
    assert_eq!(response.fragment(), br#"{"a":1}"#);
    assert!(!response.next_object());
}

#[test]
fn test_empty_results() {
    let raw = plain_response(br#"{"results":[]}"#);
    let mut response = Response::new(SliceTransport::full_slice(&raw));
    assert_eq!(response.count(), ResultCount::Empty);
    assert_eq!(response.count().as_raw(), 0);
    assert!(!response.next_object());
}

#[test]
fn test_next_object_establishes_count() {
    let raw = plain_response(BODY);
    let mut response = Response::new(SliceTransport::full_slice(&raw));
    assert!(response.next_object());
    assert_eq!(response.get_string("name"), "alpha");
    assert!(response.count().has_results());
    assert!(response.next_object());
    assert_eq!(response.get_string("name"), "beta");
}

#[test]
fn test_malformed_prefix() {
    let body = br#"{"other":[{"a":1},{"a":2}]}"#;
    let raw = plain_response(body);
    let mut response = Response::new(SliceTransport::full_slice(&raw));
    assert_eq!(response.count(), ResultCount::Malformed);
    assert_eq!(response.count().as_raw(), -1);
    assert!(response.is_ok());
    assert!(!response.next_object());
    assert!(response.fragment().is_empty());
    // Field access does not fall back to a full-body read.
    assert_eq!(response.get_int("a"), 0);
}

#[test]
fn test_field_accessors_per_element() {
    let raw = chunked_response(BODY, &[5, 17, 33]);
    let mut response = Response::new(SliceTransport::new(&raw, 4));

    let mut names = Vec::new();
    let mut total = 0;
    while response.next_object() {
        names.push(response.get_string("name").to_string());
        total += response.get_int("score");
    }
    assert_eq!(names, ["alpha", "beta", "gamma"]);
    assert_eq!(total, 6);
}

#[test]
fn test_nested_values_stay_with_their_element() {
    let raw = plain_response(BODY);
    let mut response = Response::new(SliceTransport::full_slice(&raw));
    assert!(response.next_object());
    assert!(!response.get_boolean("ok"));
    assert!(response.next_object());
    assert_eq!(response.get_string("tags"), r#"["x","y"]"#);
    assert!(response.next_object());
    assert_eq!(response.get_string("meta"), r#"{"ok":true}"#);
    assert!(!response.get_boolean("ok"));
}

#[test]
fn test_caller_buffer_truncates_elements() {
    let raw = plain_response(BODY);
    let mut storage = [0u8; 12];
    let mut response = Response::new(SliceTransport::full_slice(&raw));
    response.set_buffer(&mut storage);

    let mut seen = 0;
    while response.next_object() {
        assert_eq!(response.fragment().len(), 12);
        seen += 1;
    }
    assert_eq!(seen, 3);
}

#[test]
fn test_status_not_ok_still_parses() {
    let mut raw = b"HTTP/1.1 400 Bad Request\r\nContent-Length: 21\r\n\r\n".to_vec();
    raw.extend_from_slice(br#"{"results":[{"a":1}]}"#);
    let mut response = Response::new(SliceTransport::full_slice(&raw));
    assert!(response.count().has_results());
    assert!(!response.is_ok());
}

#[test]
fn test_stalled_transport_ends_iteration() {
    let mut raw = plain_response(BODY);
    // Announce more than is sent and cut the body after the first element.
    let cut = raw.len() - (BODY.len() - 45);
    raw.truncate(cut);
    let mut transport = SliceTransport::full_slice(&raw).hold_open();
    {
        let config = Config::default().with_timeout_ms(15);
        let mut response = Response::with_config(&mut transport, config);
        assert!(response.next_object());
        assert_eq!(response.get_int("score"), 1);
        assert!(!response.next_object());
    }
    assert_eq!(transport.waited_ms(), 15);
}

#[test]
fn test_slow_transport_keeps_lines_whole() {
    let raw = plain_response(br#"{"results":[{"a":1}]}"#);
    let mut response = Response::new(SliceTransport::full_slice(&raw).trickle(4));
    assert_eq!(response.count(), ResultCount::Estimated(3));
    assert!(response.is_ok());
    assert_eq!(response.head().and_then(|head| head.content_length), Some(21));
    assert!(response.next_object());
    assert_eq!(response.fragment(), br#"{"a":1}"#);
    assert!(!response.next_object());
}

#[test]
fn test_slow_chunked_transport_matches_plain() {
    let slow_walk = |raw: &[u8]| {
        let mut response = Response::new(SliceTransport::full_slice(raw).trickle(3));
        let mut objects = Vec::new();
        while response.next_object() {
            objects.push(squeeze(response.fragment()));
        }
        objects
    };
    let expected: Vec<Vec<u8>> = ELEMENTS.iter().map(|e| squeeze(e)).collect();
    assert_eq!(slow_walk(&plain_response(BODY)), expected);
    assert_eq!(slow_walk(&chunked_response(BODY, &[7, 50])), expected);
    assert_eq!(slow_walk(&chunked_response(BODY, &[1; 200])), expected);
}

#[test]
fn test_headers_missing() {
    let mut response = Response::new(SliceTransport::full_slice(b"HTTP/1.1 200 OK\r\n"));
    assert_eq!(response.count(), ResultCount::Failed);
    assert!(!response.next_object());
}

#[test]
fn test_small_window_many_refills() {
    let raw = plain_response(BODY);
    let (_, objects) = collect_objects::<4>(&raw, 3);
    let expected: Vec<Vec<u8>> = ELEMENTS.iter().map(|e| squeeze(e)).collect();
    assert_eq!(objects, expected);
}

fn assert_chunked_matches_plain<const W: usize>(piece: usize) {
    let (_, plain) = collect_objects::<W>(&plain_response(BODY), piece);
    let (_, single_chunk) = collect_objects::<W>(&chunked_response(BODY, &[]), piece);
    let (_, three_chunks) = collect_objects::<W>(&chunked_response(BODY, &[7, 50]), piece);
    let (_, tiny_chunks) = collect_objects::<W>(&chunked_response(BODY, &[1; 200]), piece);

    assert_eq!(plain.len(), 3);
    assert_eq!(single_chunk, plain);
    assert_eq!(three_chunks, plain);
    assert_eq!(tiny_chunks, plain);
}

macro_rules! equivalence_tests {
    ($(($window:literal, $piece:literal)),*) => {
        $(
            paste::paste! {
                #[test]
                fn [<test_chunked_matches_plain_window_ $window _piece_ $piece>]() {
                    assert_chunked_matches_plain::<$window>($piece);
                }
            }
        )*
    };
}

equivalence_tests!((1, 1), (4, 1), (4, 3), (16, 2), (64, 7), (1024, 1000));

#[test]
fn test_responses_are_independent() {
    let raw = plain_response(BODY);
    let (count_a, first) = collect_objects::<32>(&raw, 5);
    let (count_b, second) = collect_objects::<32>(&raw, 5);
    assert_eq!(count_a, count_b);
    assert_eq!(first, second);
}

#[test]
fn test_transport_returned() {
    let raw = plain_response(br#"{"results":[]}"#);
    let mut response = Response::new(SliceTransport::full_slice(&raw));
    assert_eq!(response.count(), ResultCount::Empty);
    let mut transport = response.into_transport();
    assert_eq!(transport.available(), 0);
}
