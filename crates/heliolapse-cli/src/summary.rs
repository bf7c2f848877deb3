use std::path::Path;

use console::Style;
use heliolapse_core::pipeline::config::AlignConfig;
use heliolapse_core::pipeline::{AlignmentReport, RunOutcome};

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    method: Style,
    disabled: Style,
    path: Style,
    ok: Style,
    failed: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            method: Style::new().green(),
            disabled: Style::new().dim().yellow(),
            path: Style::new().underlined(),
            ok: Style::new().green().bold(),
            failed: Style::new().red().bold(),
        }
    }
}

pub fn print_align_summary(config: &AlignConfig) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("Heliolapse Alignment"));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(20)));
    println!();

    println!(
        "  {:<14}{}",
        s.label.apply_to("Reference"),
        s.path.apply_to(config.reference.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Input"),
        s.path.apply_to(config.input_dir.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Aligned"),
        s.path.apply_to(config.aligned_dir.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Workers"),
        s.value.apply_to(config.worker_count())
    );
    println!();

    println!("  {}", s.header.apply_to("Rigid"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Refine"),
        if config.rigid.refine_translation {
            s.method.apply_to("phase correlation")
        } else {
            s.disabled.apply_to("centres only")
        }
    );
    println!();

    let reg = &config.registration;
    println!("  {}", s.header.apply_to("Deformable"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Mode"),
        s.method.apply_to(reg.mode)
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Force"),
        s.method.apply_to(reg.force)
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Iterations"),
        s.value.apply_to(reg.iterations)
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Std dev"),
        s.value.apply_to(format!("{} px", reg.std_dev))
    );
    match reg.max_displacement_fraction {
        Some(f) => println!(
            "    {:<12}{}",
            s.label.apply_to("Max shift"),
            s.value.apply_to(format!("{:.1}% of diagonal", f * 100.0))
        ),
        None => println!(
            "    {:<12}{}",
            s.label.apply_to("Max shift"),
            s.disabled.apply_to("unbounded")
        ),
    }
    println!();
}

pub fn print_report(report: &AlignmentReport) {
    let s = Styles::new();

    println!();
    let line = format!("{} of {} frames aligned", report.succeeded(), report.total());
    match report.outcome() {
        RunOutcome::Complete => println!("  {}", s.ok.apply_to(line)),
        RunOutcome::Partial | RunOutcome::Failed => println!("  {}", s.failed.apply_to(line)),
    }

    let mut failures = report.failures().peekable();
    if failures.peek().is_some() {
        println!();
        println!("  {}", s.header.apply_to("Failed frames"));
        for f in failures {
            let name = f
                .input
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| f.input.display().to_string());
            println!("    {}  {}", s.value.apply_to(name), s.label.apply_to(&f.reason));
        }
    }
    println!();
}

pub fn print_movie_saved(path: &Path, frames: usize) {
    let s = Styles::new();
    println!(
        "  {:<14}{} ({} frames)",
        s.label.apply_to("Movie"),
        s.path.apply_to(path.display()),
        frames
    );
}
