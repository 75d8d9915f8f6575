#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use shiguredo_gemini::{DecoderLimits, Error, RequestDecoder, ResponseDecoder};

#[derive(Debug, Arbitrary)]
struct Input {
    max_url_length: u16,
    max_meta_length: u16,
    data: Vec<u8>,
}

fuzz_target!(|input: Input| {
    let limits = DecoderLimits {
        max_url_length: input.max_url_length as usize,
        max_meta_length: input.max_meta_length as usize,
    };

    let mut decoder = ResponseDecoder::with_limits(limits.clone());
    decoder.feed(&input.data);
    match decoder.decode() {
        Ok(Some(header)) => assert!(header.meta.len() <= limits.max_meta_length),
        Err(Error::MetaTooLong { limit, .. }) => assert_eq!(limit, limits.max_meta_length),
        _ => {}
    }

    let mut decoder = RequestDecoder::with_limits(limits.clone());
    decoder.feed(&input.data);
    match decoder.decode() {
        Ok(Some(url)) => assert!(!url.is_empty()),
        Err(Error::RequestLineTooLong { limit, .. }) => assert_eq!(limit, limits.max_url_length),
        _ => {}
    }
});
