//! Write `sample_data.csv`: a small sales table with repeated rows and
//! blank cells, for trying out the cleaning steps.

use anyhow::{Context, Result};

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

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[(self.next_u64() % items.len() as u64) as usize]
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let mut rng = SimpleRng::new(42);

    let regions = ["North", "South", "East", "West"];
    let products = ["Widget", "Gadget", "Gizmo"];

    let output_path = "sample_data.csv";
    let mut writer = csv::Writer::from_path(output_path).context("creating sample CSV")?;
    writer.write_record(["order_id", "region", "product", "units", "price"])?;

    let mut rows: Vec<[String; 5]> = Vec::new();
    for order_id in 1..=40 {
        let units = (rng.next_f64() * 20.0).floor() + 1.0;
        let price = (rng.next_f64() * 5000.0).round() / 100.0;
        // Roughly one row in eight is missing a number.
        let units = if rng.next_f64() < 0.125 { String::new() } else { units.to_string() };
        let price = if rng.next_f64() < 0.125 { String::new() } else { price.to_string() };
        rows.push([
            order_id.to_string(),
            rng.pick(&regions).to_string(),
            rng.pick(&products).to_string(),
            units,
            price,
        ]);
    }

    // Repeat a few rows verbatim so duplicate removal has something to do.
    let repeats: Vec<[String; 5]> = (0..5)
        .map(|_| rows[(rng.next_u64() % rows.len() as u64) as usize].clone())
        .collect();
    rows.extend(repeats);

    for row in &rows {
        writer.write_record(row)?;
    }
    writer.flush().context("flushing sample CSV")?;

    println!("Wrote {} rows (5 repeated) to {output_path}", rows.len());
    Ok(())
}
