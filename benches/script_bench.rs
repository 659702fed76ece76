use criterion::{criterion_group, criterion_main, Criterion};
use rfshot::ScreenshotRequest;

fn bench_render_script(c: &mut Criterion) {
    let mut plain = ScreenshotRequest::new();
    plain.set_url("https://example.com/landing").unwrap();

    let mut styled = plain.clone();
    styled
        .set_background_color("#fafafa")
        .unwrap()
        .set_height_to_render_whole_page();

    c.bench_function("render_script", |b| {
        b.iter(|| plain.render_script("/tmp/shot.png").unwrap())
    });

    c.bench_function("render_script_with_background", |b| {
        b.iter(|| styled.render_script("/tmp/shot.png").unwrap())
    });
}

criterion_group!(benches, bench_render_script);
criterion_main!(benches);
