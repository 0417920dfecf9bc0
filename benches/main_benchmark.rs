use criterion::{Criterion, criterion_group, criterion_main};
use msrun::build::{RunAccumulator, ToolKind, build_args, classify};
use msrun::config::Settings;
use msrun::project::{DeclarationKind, Position, SourceOutline};
use std::hint::black_box;
use std::path::Path;

const MOCK_SETTINGS: &str = r#"
solution_dir = "C:/src/Shop"
timeout_secs = 600

[build]
tool = "msbuild"
extra_args = ["/m", "/nologo"]
configuration = "Release"

[test]
tool = "mstest"
"#;

const LOCATED: &str = "  Services/Cart.cs(42,17): error CS0103: The name 'total' does not exist in the current context [C:\\src\\Shop\\Shop.csproj]";
const NOISE: &str = "  Shop -> C:\\src\\Shop\\bin\\Debug\\Shop.dll";
const PROJECT_PREFIXED: &str = "3>Services/Cart.cs(42,17): warning CS0168: The variable 'e' is declared but never used [Shop.csproj]";

const SOURCE: &str = r#"using System;

namespace Shop.Tests
{
    [TestClass]
    public class CartTests
    {
        private readonly Cart _cart = new Cart();

        [TestMethod]
        public void Adds_item()
        {
            _cart.Add("apple", 2);
            Assert.AreEqual(2, _cart.Count);
        }

        [TestMethod]
        public async Task Removes_item()
        {
            // "braces" in comments { are ignored
            var text = "}";
            await _cart.RemoveAsync("apple");
        }
    }
}
"#;

fn bench_classify(c: &mut Criterion) {
    c.bench_function("classify_located", |b| {
        b.iter(|| classify(black_box(LOCATED)))
    });

    c.bench_function("classify_noise", |b| {
        b.iter(|| {
            let _ = classify(black_box(NOISE));
            let _ = classify(black_box(PROJECT_PREFIXED));
        })
    });
}

fn bench_accumulator(c: &mut Criterion) {
    let lines: Vec<&str> = std::iter::repeat([NOISE, LOCATED, NOISE, PROJECT_PREFIXED])
        .take(250)
        .flatten()
        .chain(["Build succeeded."])
        .collect();

    c.bench_function("accumulate_1000_lines", |b| {
        b.iter(|| {
            let mut acc = RunAccumulator::new(ToolKind::Build);
            for line in &lines {
                acc.observe(black_box(line));
            }
            acc.finish()
        })
    });
}

fn bench_outline(c: &mut Criterion) {
    c.bench_function("parse_outline", |b| {
        b.iter(|| SourceOutline::parse(black_box(SOURCE)))
    });

    let outline = SourceOutline::parse(SOURCE);
    c.bench_function("enclosing_method", |b| {
        b.iter(|| outline.enclosing(DeclarationKind::Method, black_box(Position::new(13, 20))))
    });
}

fn bench_settings(c: &mut Criterion) {
    c.bench_function("parse_msrun_toml", |b| {
        b.iter(|| Settings::from_toml(black_box(MOCK_SETTINGS)).unwrap())
    });

    c.bench_function("build_args", |b| {
        b.iter(|| {
            build_args(
                black_box(Path::new("C:/src/Shop/Shop.csproj")),
                black_box("Release"),
                black_box(true),
            )
        })
    });
}

criterion_group!(
    benches,
    bench_classify,
    bench_accumulator,
    bench_outline,
    bench_settings
);
criterion_main!(benches);
