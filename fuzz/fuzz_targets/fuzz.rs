#![no_main]
use decorum::{has_been_filtered, split_into_sentences, Blocklist, Filter, Level};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if !data.is_empty() {
        let flags = data[0];
        let input = &data[1..];

        if let Ok(text) = std::str::from_utf8(input) {
            let level = Level::EACH[flags as usize % Level::EACH.len()];
            let mut filter = Filter::new();
            filter
                .with_level(level)
                .with_replacement(if flag(flags, 3) { '#' } else { '*' });
            if flag(flags, 4) {
                let _ = filter.with_custom_words(text.split_whitespace().take(3));
            }

            let _ = filter.is_profane(text);
            let _ = filter.find(text);
            let _ = has_been_filtered(text);
            let _ = split_into_sentences(text);

            let censored = filter.censor(text);
            assert_eq!(censored.chars().count(), text.chars().count());

            let _ = filter.rewrite(text);

            let _ = Blocklist::builtin().is_url_blocked(text, &["adult", "gambling"]);
            let _ = Blocklist::builtin().is_domain_blocked(text, &["adult"]);
        }
    }
});

fn flag(flags: u8, index: u8) -> bool {
    ((flags >> index) & 1) == 1
}
