//! Rendering benchmarks — surface diff and ANSI encoding.

#![allow(missing_docs)]

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use braid_tui::{
    AnsiEncoder, Color, ColorSupport, Comparer, CompositeSurface, NamedColor, Position, Style,
    Surface,
};

fn checkerboard(width: u16, height: u16, step: u16, style: &Style) -> Surface {
    let mut surface = Surface::new(width, height);
    for y in 0..height {
        for x in 0..width {
            if (x + y) % step == 0 {
                surface.write_text(x, y, "X", style);
            }
        }
    }
    surface
}

/// Benchmark surface diff for an 80x24 grid with half the cells changed.
fn benchmark_surface_diff_80x24(c: &mut Criterion) {
    let style = Style::new().fg(Color::Named(NamedColor::Red));
    c.bench_function("surface_diff_80x24", |b| {
        b.iter(|| {
            let previous = Surface::new(80, 24);
            let current = checkerboard(80, 24, 2, &style);
            black_box(Comparer::new().diff(&previous, &current))
        })
    });
}

/// Benchmark diff plus ANSI encoding for a 120x40 grid.
fn benchmark_diff_encode_120x40(c: &mut Criterion) {
    let style = Style::new().fg(Color::Named(NamedColor::Green));
    let encoder = AnsiEncoder::new(ColorSupport::TrueColor);
    c.bench_function("diff_encode_120x40", |b| {
        b.iter(|| {
            let previous = Surface::new(120, 40);
            let current = checkerboard(120, 40, 3, &style);
            let diff = Comparer::new().diff(&previous, &current);
            black_box(encoder.encode(&diff))
        })
    });
}

/// Benchmark encoding a sparse frame update (the steady-state case: a
/// few runs against a mostly unchanged screen).
fn benchmark_encode_sparse_update(c: &mut Criterion) {
    let style = Style::new().fg(Color::Rgb {
        r: 255,
        g: 100,
        b: 50,
    });
    let previous = checkerboard(120, 40, 3, &style);
    let mut current = previous.clone();
    for y in (0..40).step_by(8) {
        current.write_text(10, y, "updated status line", &style);
    }
    let diff = Comparer::new().diff(&previous, &current);
    let encoder = AnsiEncoder::new(ColorSupport::TrueColor);
    c.bench_function("encode_sparse_update", |b| {
        b.iter(|| black_box(encoder.encode(&diff)))
    });
}

/// Benchmark flattening a base layer with a popup overlay.
fn benchmark_composite_flatten(c: &mut Criterion) {
    let style = Style::new().fg(Color::Named(NamedColor::Blue));
    let base = checkerboard(120, 40, 2, &style);
    let mut popup = Surface::new(40, 10);
    for y in 0..10 {
        popup.write_text(0, y, "popup content row", &Style::default());
    }
    c.bench_function("composite_flatten_120x40", |b| {
        b.iter(|| {
            let mut composite = CompositeSurface::new(120, 40);
            composite.push_layer(base.clone(), Position::new(0, 0), true);
            composite.push_layer(popup.clone(), Position::new(30, 12), true);
            black_box(composite.flatten())
        })
    });
}

criterion_group!(
    benches,
    benchmark_surface_diff_80x24,
    benchmark_diff_encode_120x40,
    benchmark_encode_sparse_update,
    benchmark_composite_flatten
);
criterion_main!(benches);
