#![no_main]

use libfuzzer_sys::fuzz_target;
use shiguredo_gemini::{ResponseDecoder, encode_header};

fuzz_target!(|data: &[u8]| {
    // 一括で feed
    let mut decoder = ResponseDecoder::new();
    decoder.feed(data);
    let whole = decoder.decode();
    if let Ok(Some(header)) = &whole {
        assert!(decoder.is_complete());
        assert!(header.meta.len() <= 1024);
        // 再エンコードした行は同じヘッダーにデコードされる
        let mut again = ResponseDecoder::new();
        again.feed(&encode_header(header));
        assert_eq!(again.decode().ok().flatten().as_ref(), Some(header));
    }

    // データを分割して feed (ストリーミングシナリオ)
    // 結果は一括で feed した場合と一致する
    decoder.reset();
    let mut split = Ok(None);
    for chunk in data.chunks(7) {
        decoder.feed(chunk);
        split = decoder.decode();
        if !matches!(split, Ok(None)) {
            break;
        }
    }
    match (&whole, &split) {
        (Ok(Some(a)), Ok(Some(b))) => assert_eq!(a, b),
        (Ok(None), Ok(None)) | (Err(_), Err(_)) => {}
        _ => panic!("split feed differs: {:?} vs {:?}", whole, split),
    }
});
