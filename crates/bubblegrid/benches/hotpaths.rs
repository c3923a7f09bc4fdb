use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use bubblegrid::{
    sample_layout, BubbleLayout, GradeConfig, Grader, GridSpec, SheetInput,
};

const N_QUESTIONS: usize = 100;

fn bench_layout() -> BubbleLayout {
    let grid = GridSpec {
        origin_px: [60, 80],
        n_questions: N_QUESTIONS,
        bubble_size_px: [28, 28],
        option_pitch_px: 44,
        question_pitch_px: 36,
    };
    BubbleLayout::from_grid("bench", &["A", "B", "C", "D", "E"], &grid).expect("valid grid")
}

/// Scanner-like sheet: noisy paper with one inked bubble per question.
fn render_sheet(layout: &BubbleLayout, rng: &mut StdRng) -> (GrayImage, Vec<usize>) {
    let [w, h] = layout.required_size();
    let mut img = GrayImage::from_fn(w + 60, h + 80, |_, _| Luma([rng.gen_range(215..=245)]));
    let mut marks = Vec::with_capacity(layout.n_questions());
    for q in layout.questions() {
        let option = rng.gen_range(0..q.bubbles.len());
        let r = q.bubbles[option];
        for y in r.y..r.y + r.h {
            for x in r.x..r.x + r.w {
                img.put_pixel(x, y, Luma([rng.gen_range(10..=60)]));
            }
        }
        marks.push(option);
    }
    (img, marks)
}

fn png_bytes(img: &GrayImage) -> Vec<u8> {
    let mut buf = std::io::Cursor::new(Vec::new());
    DynamicImage::ImageLuma8(img.clone())
        .write_to(&mut buf, ImageFormat::Png)
        .expect("png encoding");
    buf.into_inner()
}

fn bench_sample_layout(c: &mut Criterion) {
    let layout = bench_layout();
    let mut rng = StdRng::seed_from_u64(7);
    let (img, _) = render_sheet(&layout, &mut rng);

    c.bench_function("sample_layout_100q_5opt", |b| {
        b.iter(|| sample_layout(black_box(&img), black_box(&layout)).expect("in bounds"))
    });
}

fn bench_grade_batch(c: &mut Criterion) {
    let layout = bench_layout();
    let mut rng = StdRng::seed_from_u64(11);
    let (_, key_marks) = render_sheet(&layout, &mut rng);
    let key: Vec<&str> = key_marks
        .iter()
        .map(|&m| layout.options().get(m).expect("valid option"))
        .collect();

    let sheets: Vec<SheetInput> = (0..16)
        .map(|i| {
            let (img, _) = render_sheet(&layout, &mut rng);
            SheetInput::new(format!("sheet{i}.png"), png_bytes(&img))
        })
        .collect();

    let mut config = GradeConfig::default();
    config.annotate.enable = false;
    let grader = Grader::from_key_text(layout.clone(), &key.join("\n"), config).expect("valid key");

    c.bench_function("grade_batch_16_sheets", |b| {
        b.iter(|| {
            let report = grader.grade_batch(black_box(&sheets));
            assert_eq!(report.n_failed(), 0);
        })
    });
}

criterion_group!(benches, bench_sample_layout, bench_grade_batch);
criterion_main!(benches);
