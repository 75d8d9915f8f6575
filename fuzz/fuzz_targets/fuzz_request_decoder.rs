#![no_main]

use libfuzzer_sys::fuzz_target;
use shiguredo_gemini::{RequestDecoder, encode_request};

fuzz_target!(|data: &[u8]| {
    let mut decoder = RequestDecoder::new();
    decoder.feed(data);
    if let Ok(Some(url)) = decoder.decode() {
        assert!(url.len() <= 1024);
        let mut again = RequestDecoder::new();
        again.feed(&encode_request(&url));
        let decoded = again.decode().ok().flatten();
        assert_eq!(decoded.as_ref().map(|u| u.as_str()), Some(url.as_str()));
    }

    decoder.reset();
    for chunk in data.chunks(13) {
        decoder.feed(chunk);
        match decoder.decode() {
            Ok(None) => {}
            _ => break,
        }
    }
});
