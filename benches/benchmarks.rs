use criterion::{criterion_group, criterion_main, Criterion};
use page_mirror::html_parser::{summarize, MarkupDocument};
use page_mirror::{extract_references, AssetResolver, ReferenceOrigin};
use std::hint::black_box;
use url::Url;

const PAGE: &str = r#"
    <html>
        <head>
            <link rel="stylesheet" href="/style.css">
            <script src="/script.js"></script>
            <link rel="stylesheet" href="/theme.css">
            <script src="/utils.js"></script>
        </head>
        <body>
            <img src="/logo.png" alt="Logo">
            <img src="/banner.jpg" alt="Banner">
            <a href="/about">About</a>
            <a href="/contact">Contact</a>
            <form action="/search"></form>
        </body>
    </html>
"#;

fn bench_page_summary(c: &mut Criterion) {
    c.bench_function("summarize_page", |b| {
        b.iter(|| summarize(black_box(PAGE)));
    });
}

fn bench_markup_rewrite(c: &mut Criterion) {
    c.bench_function("rewrite_and_serialize_page", |b| {
        b.iter(|| {
            let document = MarkupDocument::parse(black_box(PAGE)).unwrap();
            for reference in document.references() {
                document.rewrite(&reference, "images/local.png");
            }
            document.strip_links();
            document.serialize().unwrap()
        });
    });
}

fn bench_url_resolution(c: &mut Criterion) {
    let resolver = AssetResolver::new();
    let base = Url::parse("https://example.com/subdir/page.html").unwrap();
    let test_urls = vec![
        "../style.css",
        "./script.js",
        "images/photo.jpg",
        "https://cdn.example.com/style.css",
        "//cdn.example.com/script.js",
        "../../../assets/font.woff2",
        "./nested/path/file.css",
    ];

    c.bench_function("resolve_urls", |b| {
        b.iter(|| {
            for url in &test_urls {
                let _resolved = resolver
                    .resolve(&base, black_box(url), ReferenceOrigin::CssUrl)
                    .unwrap();
            }
        });
    });
}

fn bench_css_reference_extraction(c: &mut Criterion) {
    let css_content = r#"
        .bg1 { background-image: url('/images/bg1.jpg'); }
        .bg2 { background: url("/images/bg2.jpg"); }
        .bg3 { background-image: url(/images/bg3.jpg); }
        .bg4 { background: url("data:image/png;base64,AAAA"); }
        .bg5 { color: blue; }
        @font-face { src: url(/fonts/a.woff2) format("woff2"), url(/fonts/a.ttf); }
    "#;

    c.bench_function("extract_css_references", |b| {
        b.iter(|| extract_references(black_box(css_content)));
    });
}

criterion_group!(
    benches,
    bench_page_summary,
    bench_markup_rewrite,
    bench_url_resolution,
    bench_css_reference_extraction,
);
criterion_main!(benches);
