use crate::model::{Agent, FrameRef, Kind};
use anyhow::{Context, Result};
use rmp_serde::encode;
use std::{
    fmt::{self, Write as _},
    fs,
    io::Write,
    path::{Path, PathBuf},
};

/// Receiver of population snapshots, called before every sweep.
pub trait Renderer {
    fn render(&mut self, agt_vec: &[Agent], cycle: usize) -> Result<()>;

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

// An empty list renders nothing.
impl Renderer for Vec<Box<dyn Renderer>> {
    fn render(&mut self, agt_vec: &[Agent], cycle: usize) -> Result<()> {
        for renderer in self.iter_mut() {
            renderer.render(agt_vec, cycle)?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        for renderer in self.iter_mut() {
            renderer.finish()?;
        }
        Ok(())
    }
}

/// Appends every snapshot to a MessagePack stream of frames.
pub struct TrajectoryWriter<W: Write> {
    writer: W,
}

impl<W: Write> TrajectoryWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> Renderer for TrajectoryWriter<W> {
    fn render(&mut self, agt_vec: &[Agent], cycle: usize) -> Result<()> {
        let frame = FrameRef { cycle, agt_vec };
        encode::write(&mut self.writer, &frame).context("failed to serialize frame")?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush().context("failed to flush writer stream")?;
        Ok(())
    }
}

/// Writes one scatter plot per cycle as `snapshot-NNNN.svg`.
pub struct SvgRenderer {
    dir: PathBuf,
}

impl SvgRenderer {
    const SIZE: f64 = 480.0;

    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn snapshot_file(&self, cycle: usize) -> PathBuf {
        self.dir.join(format!("snapshot-{cycle:04}.svg"))
    }

    fn draw<W: fmt::Write>(out: &mut W, agt_vec: &[Agent], cycle: usize) -> fmt::Result {
        let size = Self::SIZE;
        writeln!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{size}" height="{size}" viewBox="0 0 {size} {size}">"#
        )?;
        writeln!(
            out,
            r#"<rect width="{size}" height="{size}" fill="white" stroke="black"/>"#
        )?;
        writeln!(out, "<title>cycle {cycle}</title>")?;
        for kind in Kind::ALL {
            writeln!(out, r#"<g id="kind-{kind}" {}>"#, style(kind))?;
            for agt in agt_vec.iter().filter(|agt| agt.kind() == kind) {
                // SVG y axis points down.
                let loc = agt.location();
                let cx = loc.x * size;
                let cy = (1.0 - loc.y) * size;
                match kind {
                    Kind::A => writeln!(out, r#"<circle cx="{cx:.2}" cy="{cy:.2}" r="4"/>"#)?,
                    Kind::B => {
                        let (x, y) = (cx - 4.0, cy - 4.0);
                        writeln!(out, r#"<rect x="{x:.2}" y="{y:.2}" width="8" height="8"/>"#)?
                    }
                }
            }
            writeln!(out, "</g>")?;
        }
        writeln!(out, "</svg>")
    }
}

fn style(kind: Kind) -> &'static str {
    match kind {
        Kind::A => r#"fill="orange" fill-opacity="0.7" stroke="black""#,
        Kind::B => r#"fill="green" fill-opacity="0.7" stroke="black""#,
    }
}

impl Renderer for SvgRenderer {
    fn render(&mut self, agt_vec: &[Agent], cycle: usize) -> Result<()> {
        let mut svg = String::new();
        Self::draw(&mut svg, agt_vec, cycle).context("failed to draw snapshot")?;

        let file = self.snapshot_file(cycle);
        fs::write(&file, svg).with_context(|| format!("failed to write {file:?}"))?;
        Ok(())
    }
}
