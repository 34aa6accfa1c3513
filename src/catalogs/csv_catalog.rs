//! Plain CSV star lists: `id,ra_deg,dec_deg,mag` with a header row.

use std::path::Path;

use anyhow::Context;

use crate::Star;

/// Read a CSV star list. Positions are in degrees.
pub fn read_star_csv<P: AsRef<Path>>(file: P) -> anyhow::Result<Vec<Star>> {
    let path = file.as_ref();
    let rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("opening star list {}", path.display()))?;
    read_stars(rdr).with_context(|| format!("reading star list {}", path.display()))
}

fn read_stars<R: std::io::Read>(mut rdr: csv::Reader<R>) -> anyhow::Result<Vec<Star>> {
    rdr.records()
        .enumerate()
        .map(|(row, result)| -> anyhow::Result<Star> {
            let record = result?;
            let field = |idx: usize| -> anyhow::Result<f64> {
                let raw = record.get(idx).unwrap_or("");
                raw.parse()
                    .with_context(|| format!("row {}: bad value {raw:?} in column {idx}", row + 1))
            };
            let id = record
                .get(0)
                .unwrap_or("")
                .parse::<u64>()
                .with_context(|| format!("row {}: bad star id", row + 1))?;
            Ok(Star {
                id,
                ra_rad: field(1)?.to_radians(),
                dec_rad: field(2)?.to_radians(),
                mag: field(3)?,
            })
        })
        .collect()
}

/// Write a CSV star list in the format read by [`read_star_csv`].
pub fn write_star_csv<P: AsRef<Path>>(file: P, stars: &[Star]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(file)?;
    wtr.write_record(["id", "ra_deg", "dec_deg", "mag"])?;
    for s in stars {
        wtr.write_record([
            s.id.to_string(),
            s.ra_rad.to_degrees().to_string(),
            s.dec_rad.to_degrees().to_string(),
            s.mag.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_star_list() {
        let data = "id,ra_deg,dec_deg,mag\n11767, 37.95, 89.26, 1.97\n32349,101.2885,-16.7131,-1.44\n";
        let stars = read_stars(
            csv::ReaderBuilder::new()
                .trim(csv::Trim::All)
                .from_reader(data.as_bytes()),
        )
        .unwrap();
        assert_eq!(stars.len(), 2);
        assert_eq!(stars[0].id, 11767);
        assert!((stars[0].dec_rad.to_degrees() - 89.26).abs() < 1e-12);
        assert!((stars[1].mag + 1.44).abs() < 1e-12);
    }

    #[test]
    fn reports_bad_rows() {
        let data = "id,ra_deg,dec_deg,mag\n1,10.0,north,2.0\n";
        let err = read_stars(csv::Reader::from_reader(data.as_bytes())).unwrap_err();
        assert!(err.to_string().contains("row 1"), "{err}");
    }

    #[test]
    fn write_then_read() {
        let path = std::env::temp_dir().join(format!("nvida_stars_{}.csv", std::process::id()));
        let stars = vec![Star::new(7, 0.25, -0.5, 4.5), Star::new(9, 6.0, 1.2, 0.3)];
        write_star_csv(&path, &stars).unwrap();
        let back = read_star_csv(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(back.len(), 2);
        assert_eq!(back[1].id, 9);
        assert!((back[0].dec_rad + 0.5).abs() < 1e-12);
    }
}
