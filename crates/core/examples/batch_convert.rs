//! Batch conversion pipeline described as a program.
//!
//! Run with: cargo run --example batch_convert
//!
//! This example demonstrates:
//! - Building per-file dependent chains and batching them as one group
//! - Composing per-capability interpreters into one
//! - Dry-running the batch with `halt` before touching any real work
//! - Interpreting the same program under both execution contexts

use std::sync::{Arc, Mutex};

use effect_core::{
    halt, run, Capability, Deferred, Handles, Immediate, Interpreter, OperationError, Program,
    Request, RunError,
};

// ============================================================================
// Capabilities
// ============================================================================

#[derive(Debug, Clone, Default)]
struct Meta {
    angle: f64,
    interval: f64,
}

#[derive(Debug, Clone, Default)]
struct Volume(Vec<f64>);

struct ReadMetadata {
    path: String,
}

impl Request for ReadMetadata {
    type Response = Meta;
    fn name() -> &'static str {
        "ReadMetadata"
    }
}

struct ReadImage {
    path: String,
    interval: f64,
}

impl Request for ReadImage {
    type Response = Volume;
    fn name() -> &'static str {
        "ReadImage"
    }
}

struct Deskew {
    volume: Volume,
    factor: f64,
}

impl Request for Deskew {
    type Response = Volume;
    fn name() -> &'static str {
        "Deskew"
    }
}

struct WriteImage {
    path: String,
    volume: Volume,
}

impl Request for WriteImage {
    type Response = String;
    fn name() -> &'static str {
        "WriteImage"
    }
}

/// Stub reader/deskewer: fixed metadata, an 8-voxel placeholder volume.
struct Reader;

impl Capability for Reader {
    fn capability_name(&self) -> &'static str {
        "Reader"
    }
}

impl Handles<ReadMetadata> for Reader {
    fn handle(&self, req: ReadMetadata) -> Result<Meta, OperationError> {
        println!("  reading metadata from {}", req.path);
        Ok(Meta {
            angle: 31.8,
            interval: 0.3,
        })
    }
}

impl Handles<ReadImage> for Reader {
    fn handle(&self, req: ReadImage) -> Result<Volume, OperationError> {
        println!(
            "  reading image {} (z interval {})",
            req.path, req.interval
        );
        Ok(Volume(vec![0.0; 8]))
    }
}

impl Handles<Deskew> for Reader {
    fn handle(&self, req: Deskew) -> Result<Volume, OperationError> {
        Ok(Volume(req.volume.0.iter().map(|v| v + req.factor).collect()))
    }
}

/// Stub writer: records paths instead of writing files.
#[derive(Default)]
struct Writer {
    written: Mutex<Vec<String>>,
}

impl Capability for Writer {
    fn capability_name(&self) -> &'static str {
        "Writer"
    }
}

impl Handles<WriteImage> for Writer {
    fn handle(&self, req: WriteImage) -> Result<String, OperationError> {
        println!("  writing {} ({} voxels)", req.path, req.volume.0.len());
        self.written
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(req.path.clone());
        Ok(req.path)
    }
}

// ============================================================================
// Program construction
// ============================================================================

/// One file's strictly ordered pipeline: metadata, image, deskew, write.
fn convert(path: &str, factor: f64) -> Program {
    let path = path.to_string();

    Program::invoke(ReadMetadata { path: path.clone() }).then_with::<ReadMetadata, _>(
        move |meta| {
            let path = path.clone();
            Program::invoke(ReadImage {
                path: path.clone(),
                interval: meta.interval,
            })
            .then_with::<ReadImage, _>(move |volume| {
                let path = path.clone();
                Program::invoke(Deskew { volume, factor }).then_with::<Deskew, _>(
                    move |volume| {
                        Program::invoke(WriteImage {
                            path: path.clone(),
                            volume,
                        })
                    },
                )
            })
        },
    )
}

fn batch(paths: &[&str], factor: f64) -> Program {
    Program::all(paths.iter().map(|p| convert(p, factor)).collect())
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<(), RunError> {
    println!("=== Batch Convert: programs, interpreters, contexts ===\n");

    let paths = ["cell1.tif", "cell2.tif", "cell3.tif"];

    // One interpreter per capability, composed into a single coverage.
    let reader = Interpreter::new()
        .with::<Reader, ReadMetadata>(Arc::new(Reader))
        .and_then(|i| i.with::<Reader, ReadImage>(Arc::new(Reader)))
        .and_then(|i| i.with::<Reader, Deskew>(Arc::new(Reader)))?;
    let writer = Interpreter::new().with::<Writer, WriteImage>(Arc::new(Writer::default()))?;
    let interpreter = Arc::new(Interpreter::compose([reader, writer])?);

    // -------------------------------------------------------------------------
    // Dry run: validate shape without touching anything
    // -------------------------------------------------------------------------
    println!("1. Dry run (halted program)");
    println!("---------------------------");

    let dry = halt(batch(&paths, 0.5));
    println!("shape:\n{}", dry.shape());
    println!("branches: {}", dry.shape().branch_count());

    let outputs = run(dry, interpreter.clone(), &Immediate)
        .await?
        .into_group()
        .unwrap_or_default();
    println!("dry run resolved {} branches, no capability invoked\n", outputs.len());

    // -------------------------------------------------------------------------
    // Immediate: one file after another, declaration order
    // -------------------------------------------------------------------------
    println!("2. Immediate context");
    println!("--------------------");

    let outputs = run(batch(&paths, 0.5), interpreter.clone(), &Immediate)
        .await?
        .into_group()
        .unwrap_or_default();
    for output in outputs {
        if let Some(path) = output.downcast::<String>() {
            println!("  done: {}", path);
        }
    }
    println!();

    // -------------------------------------------------------------------------
    // Deferred: one worker task per file, positional results
    // -------------------------------------------------------------------------
    println!("3. Deferred context");
    println!("-------------------");

    let outputs = run(batch(&paths, 0.5), interpreter, &Deferred)
        .await?
        .into_group()
        .unwrap_or_default();
    let done: Vec<String> = outputs
        .into_iter()
        .filter_map(|o| o.downcast::<String>())
        .collect();
    println!("aggregate (declaration order): {:?}", done);

    Ok(())
}
