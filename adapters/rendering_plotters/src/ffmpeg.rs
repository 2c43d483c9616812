use std::{
    ffi::OsString,
    io::{Read, Write},
    path::Path,
    process::{Child, ChildStdin, Command, Stdio},
};

use anyhow::{bail, Context, Result};
use log::debug;

/// `ffmpeg` process fed raw RGB frames over stdin.
#[derive(Debug)]
pub(crate) struct FfmpegEncoder {
    child: Child,
    stdin: Option<ChildStdin>,
    frame_len: usize,
}

impl FfmpegEncoder {
    /// Starts `program` encoding `width`x`height` frames at `fps` into `output`.
    pub(crate) fn spawn(
        program: &Path,
        output: &Path,
        (width, height): (u32, u32),
        fps: u32,
    ) -> Result<Self> {
        let args = encoder_args(output, (width, height), fps);
        debug!("spawning {} {:?}", program.display(), args);

        let mut child = Command::new(program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| {
                format!(
                    "failed to start {}; install ffmpeg or use the imagemagick writer",
                    program.display()
                )
            })?;
        let stdin = child
            .stdin
            .take()
            .context("ffmpeg stdin was not captured")?;

        Ok(Self {
            child,
            stdin: Some(stdin),
            frame_len: width as usize * height as usize * 3,
        })
    }

    /// Writes one RGB24 frame.
    pub(crate) fn write_frame(&mut self, rgb: &[u8]) -> Result<()> {
        if rgb.len() != self.frame_len {
            bail!(
                "frame holds {} bytes but the encoder expects {}",
                rgb.len(),
                self.frame_len
            );
        }
        let stdin = self
            .stdin
            .as_mut()
            .context("ffmpeg input was already closed")?;
        let Err(error) = stdin.write_all(rgb) else {
            return Ok(());
        };
        // A closed pipe usually means ffmpeg quit; its exit report explains why.
        match self.exit_report() {
            Err(exit) => Err(exit.context(format!("failed to stream frame to ffmpeg ({error})"))),
            Ok(()) => Err(error).context("failed to stream frame to ffmpeg"),
        }
    }

    /// Closes the input and waits for the movie to be written.
    pub(crate) fn finish(mut self) -> Result<()> {
        self.exit_report()
    }

    fn exit_report(&mut self) -> Result<()> {
        drop(self.stdin.take());
        let mut stderr = String::new();
        if let Some(mut pipe) = self.child.stderr.take() {
            let _ = pipe
                .read_to_string(&mut stderr)
                .context("failed to read ffmpeg diagnostics")?;
        }
        let status = self.child.wait().context("failed to wait for ffmpeg")?;
        if !status.success() {
            bail!("ffmpeg exited with {status}: {}", stderr.trim());
        }
        Ok(())
    }
}

fn encoder_args(output: &Path, (width, height): (u32, u32), fps: u32) -> Vec<OsString> {
    let mut args: Vec<OsString> = [
        "-y",
        "-loglevel",
        "error",
        "-f",
        "rawvideo",
        "-pix_fmt",
        "rgb24",
        "-s",
    ]
    .into_iter()
    .map(OsString::from)
    .collect();
    args.push(format!("{width}x{height}").into());
    args.push("-r".into());
    args.push(fps.to_string().into());
    for arg in [
        "-i",
        "-",
        "-vf",
        "scale=trunc(iw/2)*2:trunc(ih/2)*2",
        "-pix_fmt",
        "yuv420p",
    ] {
        args.push(arg.into());
    }
    args.push(output.as_os_str().to_os_string());
    args
}
