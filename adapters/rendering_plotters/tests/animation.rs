use std::{cell::RefCell, fs};

use anyhow::anyhow;
use biofilm_animation_core::{FramePair, Grid2D, GridShape, Step};
use biofilm_animation_rendering::{
    AnimationBackend, AnimationWriter, FigureLayout, FrameTiming, Presentation, RenderingError,
};
use biofilm_animation_rendering_plotters::PlottersBackend;

fn frame(step: u32, rows: u32, columns: u32) -> FramePair {
    let shape = GridShape::new(rows, columns).expect("positive dimensions");
    let values: Vec<f64> = (0..shape.cell_count())
        .map(|cell| ((cell as u32 + step) % 3) as f64)
        .collect();
    let nutrients: Vec<f64> = values.iter().map(|value| value / 2.0).collect();
    FramePair::new(
        Step::new(step),
        Grid2D::from_values(shape, values).expect("value count matches shape"),
        Grid2D::from_values(shape, nutrients).expect("value count matches shape"),
    )
}

fn presentation(writer: AnimationWriter, output: &std::path::Path) -> Presentation {
    let figure = FigureLayout::new(8.0, 4.0, 20).expect("valid layout");
    Presentation::new(figure, writer, FrameTiming::default()).with_output(output)
}

fn quiet_backend() -> PlottersBackend {
    PlottersBackend::new()
        .with_titles(false)
        .with_progress(false)
}

#[test]
fn writes_a_gif_with_one_frame_per_step() {
    let directory = tempfile::tempdir().expect("create temp dir");
    let output = directory.path().join("biofilm_animation.gif");
    let presentation = presentation(AnimationWriter::ImageMagick, &output);

    let requested = RefCell::new(Vec::new());
    quiet_backend()
        .render(&presentation, 3, |index| {
            requested.borrow_mut().push(index);
            Ok(frame(index as u32 * 10, 3, 4))
        })
        .expect("animation renders");

    assert_eq!(requested.into_inner(), vec![0, 1, 2]);
    let bytes = fs::read(&output).expect("gif was written");
    assert!(bytes.starts_with(b"GIF89a"), "output is not a GIF");
}

#[test]
fn empty_animation_is_rejected_before_writing() {
    let directory = tempfile::tempdir().expect("create temp dir");
    let output = directory.path().join("biofilm_animation.gif");
    let presentation = presentation(AnimationWriter::ImageMagick, &output);

    let error = quiet_backend()
        .render(&presentation, 0, |index| Ok(frame(index as u32, 2, 2)))
        .expect_err("nothing to render");

    assert_eq!(
        error.downcast_ref::<RenderingError>(),
        Some(&RenderingError::EmptyAnimation)
    );
    assert!(!output.exists());
}

#[test]
fn frame_errors_abort_rendering() {
    let directory = tempfile::tempdir().expect("create temp dir");
    let output = directory.path().join("broken.gif");
    let presentation = presentation(AnimationWriter::ImageMagick, &output);

    let error = quiet_backend()
        .render(&presentation, 2, |index| {
            if index == 1 {
                Err(anyhow!("step 1 is missing"))
            } else {
                Ok(frame(0, 2, 2))
            }
        })
        .expect_err("second frame fails");

    assert!(format!("{error:#}").contains("step 1 is missing"));
}

#[test]
fn mp4_output_requires_an_ffmpeg_binary() {
    let directory = tempfile::tempdir().expect("create temp dir");
    let output = directory.path().join("biofilm_animation.mp4");
    let presentation = presentation(AnimationWriter::Ffmpeg, &output);

    let error = quiet_backend()
        .with_ffmpeg_program(directory.path().join("no-such-ffmpeg"))
        .render(&presentation, 1, |index| Ok(frame(index as u32, 2, 2)))
        .expect_err("ffmpeg is unavailable");

    assert!(format!("{error:#}").contains("ffmpeg"));
}

#[cfg(unix)]
#[test]
fn ffmpeg_failures_report_its_diagnostics() {
    use std::os::unix::fs::PermissionsExt;

    let directory = tempfile::tempdir().expect("create temp dir");
    let program = directory.path().join("ffmpeg");
    fs::write(
        &program,
        "#!/bin/sh\necho 'Unknown encoder libx264' >&2\nexit 1\n",
    )
    .expect("write stand-in encoder");
    fs::set_permissions(&program, fs::Permissions::from_mode(0o755))
        .expect("make stand-in encoder executable");

    let output = directory.path().join("biofilm_animation.mp4");
    let presentation = Presentation::new(
        FigureLayout::default(),
        AnimationWriter::Ffmpeg,
        FrameTiming::default(),
    )
    .with_output(&output);

    let error = quiet_backend()
        .with_ffmpeg_program(&program)
        .render(&presentation, 3, |index| Ok(frame(index as u32, 3, 4)))
        .expect_err("encoder exits with an error");

    let message = format!("{error:#}");
    assert!(message.contains("exited"), "{message}");
    assert!(message.contains("Unknown encoder libx264"), "{message}");
}
