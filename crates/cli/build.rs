use std::{env, fs, path::PathBuf};

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=OUT_DIR");

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let completions_dir = out_dir.join("completions");

    fs::create_dir_all(&completions_dir).unwrap();

    let mut cmd = clap::Command::new("c2md")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Convert URLs and documents to clean Markdown")
        .arg(clap::arg!(<SOURCE> "URL (http/https), local file, or '-' for HTML on stdin"))
        .arg(
            clap::arg!(-m --mode <MODE> "Output mode")
                .default_value("markdown")
                .value_parser(["markdown", "screenshot", "pdf", "metadata", "archive"]),
        )
        .arg(
            clap::arg!(-o --output <PATH> "Output file or directory (default: stdout)")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(clap::arg!(-f --filename <NAME> "Custom file name, without extension"))
        .arg(clap::arg!(--raw "Disable boilerplate removal"))
        .arg(clap::arg!(--selector <CSS> "CSS selector for the content to convert"))
        .arg(clap::arg!(--browser "Render pages in headless Chromium"))
        .arg(clap::arg!(--"no-headless" "Show the browser window"))
        .arg(clap::arg!(--"wait-for" <CSS> "CSS selector the browser waits for"))
        .arg(clap::arg!(-v --verbose "Verbose progress output"))
        .arg(clap::arg!(--timeout <SECS> "Page timeout in seconds").default_value("30"))
        .arg(clap::arg!(--"user-agent" <UA> "Custom User-Agent for HTTP requests"))
        .arg(clap::arg!(--refs "Replace links with numbered citation references"))
        .arg(clap::arg!(--deep "Follow same-site links one level deep"))
        .arg(clap::arg!(--"max-pages" <N> "Maximum pages in deep mode").default_value("10"))
        .arg(clap::arg!(--"sort-by-date" "Sort deep crawl results by publication date"))
        .arg(clap::arg!(--limit <N> "Keep at most N deep crawl results"))
        .arg(clap::arg!(--"url-pattern" <GLOB> "Glob filter for deep crawl URLs (* also matches /)"))
        .arg(clap::arg!(--"no-images" "Strip images from Markdown"))
        .arg(clap::arg!(--"embed-images" "Embed images as base64 data URIs"))
        .arg(clap::arg!(--"download-images" "Download and compress images next to the output"))
        .arg(clap::arg!(--"image-width" <PX> "Maximum width for downloaded or embedded images").default_value("800"))
        .arg(clap::arg!(--"screenshot-quality" <Q> "JPEG quality for screenshots (1-100)").default_value("85"))
        .arg(clap::arg!(--"screenshot-width" <PX> "Maximum screenshot width"))
        .arg(clap::arg!(--dedupe "Drop deep crawl pages with identical content"));

    clap_complete::generate_to(clap_complete::shells::Bash, &mut cmd, "c2md", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Zsh, &mut cmd, "c2md", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Fish, &mut cmd, "c2md", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::PowerShell, &mut cmd, "c2md", &completions_dir).unwrap();

    println!(
        "cargo:warning=Shell completions generated in: {}",
        completions_dir.display()
    );
}
