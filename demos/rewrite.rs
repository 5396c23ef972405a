use decorum::{rewrite_text, Level};

fn main() {
    show_rewrite("What the hell is going on? I don't know.", Level::Moderate);
    show_rewrite("This is fucking good. Really.", Level::Moderate);
    show_rewrite("I fucking hate this", Level::All);
    show_rewrite("Nothing to see here.", Level::All);
}

fn show_rewrite(text: &str, level: Level) {
    match rewrite_text(text, level, &[]) {
        Ok(rewritten) => println!("[{}] {} -> {}", level, text, rewritten),
        Err(e) => eprintln!("{}", e),
    }
}
