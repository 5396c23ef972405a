use decorum::FilterStr;

fn main() {
    // Clean text is unaffected.
    show_censor("Helló world!");

    // Bad words are censored, one replacement per character.
    show_censor("Hello shit world ass");

    // Exceptions and longer words are left alone.
    show_censor("An assessment of the classics");

    // Common substitutions are caught.
    show_censor("sh1t f*ck f u c k");
}

fn show_censor(text: &str) {
    println!("{} -> {}", text, text.censor());
}
