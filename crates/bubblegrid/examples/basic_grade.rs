use bubblegrid::{AnswerKey, BubbleLayout, GradeConfig, Grader};
use std::error::Error;
use std::path::Path;

fn main() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 4 {
        eprintln!(
            "Usage: {} <layout.json> <key.txt> <sheet.png> [annotated.png]",
            args[0]
        );
        std::process::exit(2);
    }

    let layout = BubbleLayout::from_json_file(Path::new(&args[1]))?;
    let key = AnswerKey::from_bytes(&std::fs::read(&args[2])?)?;
    let grader = Grader::new(layout, key, GradeConfig::default())?;

    let bytes = std::fs::read(&args[3])?;
    let graded = grader.grade_bytes(&args[3], &bytes)?;

    println!("Detected: {}", graded.detection.joined());
    println!("Score:    {}", graded.score);

    if let (Some(out_path), Some(overlay)) = (args.get(4), graded.annotated.as_ref()) {
        overlay.save(out_path)?;
        println!("Wrote {out_path}");
    }
    Ok(())
}
