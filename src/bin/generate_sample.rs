use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

const ROWS: usize = 300;

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);

    let samples = ["Sample_A", "Sample_B", "Sample_C"];
    let operators = ["Alice", "Bob"];

    let mut sample = Vec::with_capacity(ROWS);
    let mut operator = Vec::with_capacity(ROWS);
    let mut batch_no = Vec::with_capacity(ROWS);
    let mut temperature = Vec::with_capacity(ROWS);
    let mut pressure = Vec::with_capacity(ROWS);

    for i in 0..ROWS {
        sample.push(samples[i % samples.len()]);
        operator.push(operators[(i / 7) % operators.len()]);
        batch_no.push((i / 25) as i64);

        // Every 37th reading is a sensor spike.
        let t = if i % 37 == 5 {
            rng.gauss(20.0, 2.0) + 40.0
        } else {
            rng.gauss(20.0, 2.0)
        };
        temperature.push(t);

        // Every 11th pressure reading is missing, a few are far too low.
        let p = match i {
            _ if i % 11 == 3 => None,
            _ if i % 53 == 17 => Some(rng.gauss(80.0, 1.0)),
            _ => Some(rng.gauss(101.3, 0.5)),
        };
        pressure.push(p);
    }

    let schema = Arc::new(Schema::new(vec![
        Field::new("sample", DataType::Utf8, false),
        Field::new("operator", DataType::Utf8, false),
        Field::new("batch", DataType::Int64, false),
        Field::new("temperature", DataType::Float64, false),
        Field::new("pressure", DataType::Float64, true),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from(sample)),
            Arc::new(StringArray::from(operator)),
            Arc::new(Int64Array::from(batch_no)),
            Arc::new(Float64Array::from(temperature)),
            Arc::new(Float64Array::from(pressure)),
        ],
    )
    .context("creating record batch")?;

    let output_path = "sample_data.parquet";
    let file = std::fs::File::create(output_path).context("creating output file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating writer")?;
    writer.write(&batch).context("writing batch")?;
    writer.close().context("closing writer")?;

    println!("Wrote {ROWS} rows to {output_path}");
    Ok(())
}
