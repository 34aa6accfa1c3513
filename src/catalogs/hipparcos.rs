//! Types and helpers for reading the Hipparcos main catalog.
//!
//! The loader understands the pipe-delimited `hip_main.dat` file of the
//! original Hipparcos release (CDS catalog I/239), available from
//! <https://cdsarc.cds.unistra.fr/ftp/I/239/hip_main.dat>.
//! Positions are ICRS at epoch J1991.25.

/// A star from the Hipparcos main catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct HipparcosStar {
    pub hip: u32,
    /// Johnson V magnitude.
    pub vmag: f64,
    pub ra_deg: f64,
    pub dec_deg: f64,
    /// Parallax in milliarcseconds.
    pub plx: f64,
    /// Proper motion in RA, `mu_alpha * cos(delta)`, milliarcseconds/year.
    pub pm_ra: f64,
    /// Proper motion in Dec, milliarcseconds/year.
    pub pm_dec: f64,
}

// Field positions in a `hip_main.dat` record.
const FIELD_HIP: usize = 1;
const FIELD_VMAG: usize = 5;
const FIELD_RA_DEG: usize = 8;
const FIELD_DEC_DEG: usize = 9;
const FIELD_PLX: usize = 11;
const FIELD_PM_RA: usize = 12;
const FIELD_PM_DEC: usize = 13;

/// Parse a single catalog record. Records without astrometry (a handful of
/// entries carry blank positions) are skipped.
fn parse_hipparcos_star(record: &str) -> Option<HipparcosStar> {
    let fields: Vec<&str> = record.split('|').map(str::trim).collect();
    if fields.len() <= FIELD_PM_DEC {
        return None;
    }
    let optional = |idx: usize| fields[idx].parse::<f64>().unwrap_or(0.0);

    Some(HipparcosStar {
        hip: fields[FIELD_HIP].parse().ok()?,
        vmag: fields[FIELD_VMAG].parse().ok()?,
        ra_deg: fields[FIELD_RA_DEG].parse().ok()?,
        dec_deg: fields[FIELD_DEC_DEG].parse().ok()?,
        plx: optional(FIELD_PLX),
        pm_ra: optional(FIELD_PM_RA),
        pm_dec: optional(FIELD_PM_DEC),
    })
}

/// Load the Hipparcos catalog from an in-memory string.
pub fn load_hipparcos_catalog(data: &str) -> Vec<HipparcosStar> {
    data.lines().filter_map(parse_hipparcos_star).collect()
}

pub fn load_hipparcos_catalog_from_file<P: AsRef<std::path::Path>>(
    path: P,
) -> anyhow::Result<Vec<HipparcosStar>> {
    let data = std::fs::read_to_string(path)?;
    Ok(load_hipparcos_catalog(&data))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
H|           1|  |00 00 00.22|+01 05 20.4| 9.10| |H|000.00091185|+01.08901332| |   3.54|   -5.20|   -1.88|  1.32|
H|           2|  |00 00 00.91|-19 29 55.8| 9.27| |G|000.00379737|-19.49883745|+|  21.90|  181.21|   -0.93|  1.28|
H|           9|  |00 00 01.98|+36 35 17.9| 8.68| |H|            |            | |       |        |        |      |
H|       32349|  |06 45 09.25|-16 42 47.3|-1.44| |H|101.28854105|-16.71314306| | 379.21| -546.01|-1223.08|  0.66|
";

    #[test]
    fn parses_records_and_skips_blank_astrometry() {
        let stars = load_hipparcos_catalog(SAMPLE);
        assert_eq!(stars.len(), 3);
        assert_eq!(stars[0].hip, 1);
        assert!((stars[0].ra_deg - 0.00091185).abs() < 1e-12);
        assert!((stars[1].dec_deg + 19.49883745).abs() < 1e-12);

        let sirius = &stars[2];
        assert_eq!(sirius.hip, 32349);
        assert!((sirius.vmag + 1.44).abs() < 1e-12);
        assert!((sirius.pm_dec + 1223.08).abs() < 1e-9);
    }

    #[test]
    fn short_records_are_ignored() {
        assert!(load_hipparcos_catalog("H|12|\n\n").is_empty());
    }
}
