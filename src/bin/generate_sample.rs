use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

const FIRST_YEAR: i64 = 2008;
const LAST_YEAR: i64 = 2024;

/// Partner, share of exports, share of imports (of the national total).
const PARTNERS: &[(&str, f64, f64)] = &[
    ("Vereinigte Staaten", 0.099, 0.069),
    ("Frankreich", 0.075, 0.051),
    ("Niederlande", 0.069, 0.077),
    ("China", 0.059, 0.114),
    ("Polen", 0.059, 0.061),
    ("Italien", 0.054, 0.052),
    ("Österreich", 0.049, 0.041),
    ("Schweiz", 0.043, 0.040),
    ("Belgien", 0.039, 0.041),
    ("Tschechien", 0.034, 0.044),
    ("Vereinigtes Königreich", 0.047, 0.025),
    ("Spanien", 0.032, 0.029),
    ("Ungarn", 0.021, 0.024),
    ("Japan", 0.013, 0.017),
    ("Nicht ermittelte Länder und Gebiete", 0.002, 0.006),
    ("Schiffs- und Luftfahrzeugbedarf", 0.001, 0.0),
];

/// Code, label, share of exports, share of imports.
const GOODS: &[(&str, &str, f64, f64)] = &[
    ("WA87", "Kraftwagen und Kraftwagenteile", 0.160, 0.090),
    ("WA84", "Maschinen", 0.140, 0.080),
    ("WA30", "Pharmazeutische Erzeugnisse", 0.070, 0.045),
    ("WA85", "Elektrische Ausrüstungen", 0.065, 0.090),
    ("WA90", "Mess- und Kontrollinstrumente", 0.045, 0.030),
    ("WA27", "Erdöl und Erdgas", 0.010, 0.090),
    ("WA29", "Chemische Erzeugnisse", 0.090, 0.070),
    ("WA72", "Metalle", 0.040, 0.055),
    ("WA39", "Kunststoffwaren", 0.035, 0.030),
    ("WA88", "Luft- und Raumfahrzeuge", 0.030, 0.025),
    ("WA62", "Bekleidung", 0.010, 0.030),
    ("WA02", "Nahrungsmittel", 0.045, 0.050),
];

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
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
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

    /// Multiplicative noise around 1.0, ±`spread`.
    fn jitter(&mut self, spread: f64) -> f64 {
        1.0 + (self.next_f64() * 2.0 - 1.0) * spread
    }
}

/// National export and import totals of a year, in EUR.
fn national_totals(year: i64, rng: &mut SimpleRng) -> (f64, f64) {
    let t = (year - FIRST_YEAR) as f64;
    // 2009 dip, steady growth afterwards, 2020 dip
    let shock = match year {
        2009 => 0.82,
        2020 => 0.90,
        _ => 1.0,
    };
    let export = (984e9 + t * 40e9) * shock * rng.jitter(0.02);
    let import = (805e9 + t * 36e9) * shock * rng.jitter(0.02);
    (export.round(), import.round())
}

fn write_csv(path: &Path, header: &[&str], rows: &[Vec<String>]) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    writer.write_record(header)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_partner_parquet(path: &Path, rows: &[(i64, String, f64, f64)]) -> Result<()> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("Jahr", DataType::Int64, false),
        Field::new("Land", DataType::Utf8, false),
        Field::new("export_wert", DataType::Float64, false),
        Field::new("import_wert", DataType::Float64, false),
    ]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int64Array::from(rows.iter().map(|r| r.0).collect::<Vec<_>>())),
            Arc::new(StringArray::from(rows.iter().map(|r| r.1.as_str()).collect::<Vec<_>>())),
            Arc::new(Float64Array::from(rows.iter().map(|r| r.2).collect::<Vec<_>>())),
            Arc::new(Float64Array::from(rows.iter().map(|r| r.3).collect::<Vec<_>>())),
        ],
    )?;

    let file = std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let out_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("sample_data"));
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;

    let mut rng = SimpleRng::new(42);

    let mut yearly = Vec::new();
    let mut monthly = Vec::new();
    let mut partners = Vec::new();
    let mut goods = Vec::new();

    for year in FIRST_YEAR..=LAST_YEAR {
        let (export, import) = national_totals(year, &mut rng);

        // Months: split the year with a mild seasonal pattern, last month
        // takes the remainder so the months add up to the year.
        let weights: Vec<f64> = (1..=12)
            .map(|m| 1.0 + 0.08 * ((m as f64 - 3.0) / 12.0 * std::f64::consts::TAU).sin())
            .collect();
        let total_weight: f64 = weights.iter().sum();
        let (mut exp_left, mut imp_left) = (export, import);
        for (i, w) in weights.iter().enumerate() {
            let (e, m) = if i == 11 {
                (exp_left, imp_left)
            } else {
                let e = (export * w / total_weight).round();
                let m = (import * w / total_weight).round();
                (e, m)
            };
            exp_left -= e;
            imp_left -= m;
            monthly.push(vec![
                year.to_string(),
                (i + 1).to_string(),
                e.to_string(),
                m.to_string(),
                (e + m).to_string(),
            ]);
        }
        yearly.push(vec![
            year.to_string(),
            export.to_string(),
            import.to_string(),
            (export + import).to_string(),
        ]);

        for &(name, exp_share, imp_share) in PARTNERS {
            let e = (export * exp_share * rng.jitter(0.08)).round();
            let m = (import * imp_share * rng.jitter(0.08)).round();
            partners.push((year, name.to_string(), e, m));
        }

        for &(code, label, exp_share, imp_share) in GOODS {
            let e = (export * exp_share * rng.jitter(0.10)).round();
            let m = (import * imp_share * rng.jitter(0.10)).round();
            goods.push(vec![
                year.to_string(),
                code.to_string(),
                label.to_string(),
                e.to_string(),
                m.to_string(),
            ]);
        }
    }

    write_csv(
        &out_dir.join("gesamt_deutschland.csv"),
        &["Jahr", "gesamt_export", "gesamt_import", "gesamt_handelsvolumen"],
        &yearly,
    )?;
    write_csv(
        &out_dir.join("gesamt_deutschland_monthly.csv"),
        &["Jahr", "Monat", "export_wert", "import_wert", "handelsvolumen_wert"],
        &monthly,
    )?;
    let partner_rows: Vec<Vec<String>> = partners
        .iter()
        .map(|(y, name, e, m)| vec![y.to_string(), name.clone(), e.to_string(), m.to_string()])
        .collect();
    write_csv(
        &out_dir.join("df_grouped.csv"),
        &["Jahr", "Land", "export_wert", "import_wert"],
        &partner_rows,
    )?;
    write_partner_parquet(&out_dir.join("df_grouped.parquet"), &partners)?;
    write_csv(
        &out_dir.join("aggregated_df.csv"),
        &["Jahr", "Code", "Label", "Ausfuhr: Wert", "Einfuhr: Wert"],
        &goods,
    )?;

    println!(
        "Wrote {} years of sample tables ({} partners, {} goods) to {}",
        LAST_YEAR - FIRST_YEAR + 1,
        PARTNERS.len(),
        GOODS.len(),
        out_dir.display()
    );
    Ok(())
}
