#![no_main]

use libfuzzer_sys::fuzz_target;
use shiguredo_gemini::host::Host;
use shiguredo_gemini::url::{RequestUrl, Url};

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(url) = Url::parse(s) {
        let _ = url.scheme();
        let _ = url.host().address();
        let _ = url.port_or_default();
        let _ = url.path();
        let _ = url.query();
        let _ = url.fragment();

        // シリアライズした URL は同じ URL にパースされる
        let serialized = url.to_string();
        let reparsed = Url::parse(&serialized).expect("serialized URL must parse");
        assert_eq!(reparsed.to_string(), serialized);

        if let Ok(request_url) = RequestUrl::try_from(url) {
            assert!(request_url.len() <= 1024);
        }
    }

    let _ = Host::parse(s);
});
