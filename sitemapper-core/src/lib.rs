pub mod crawl;
pub mod report;

pub fn print_banner() {
    println!(
        r#"
     _ _
 ___(_) |_ ___ _ __ ___   __ _ _ __  _ __   ___ _ __
/ __| | __/ _ \ '_ ` _ \ / _` | '_ \| '_ \ / _ \ '__|
\__ \ | ||  __/ | | | | | (_| | |_) | |_) |  __/ |
|___/_|\__\___|_| |_| |_|\__,_| .__/| .__/ \___|_|
                              |_|   |_|    v{}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
