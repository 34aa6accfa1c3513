/// A catalog star used for identification.
///
/// RA & Dec are in radians and assume proper motion has already been applied
/// to the observation epoch. The magnitude is the catalog's visual magnitude
/// (lower is brighter).
#[derive(Debug, Clone, PartialEq)]
pub struct Star {
    pub id: u64,
    pub ra_rad: f64,
    pub dec_rad: f64,
    pub mag: f64,
}

impl Star {
    pub fn new(id: u64, ra_rad: f64, dec_rad: f64, mag: f64) -> Self {
        Self {
            id,
            ra_rad,
            dec_rad,
            mag,
        }
    }

    /// Unit vector pointing to the star's position on the celestial sphere.
    pub fn uvec(&self) -> crate::Vector3 {
        crate::geometry::angles_to_vector(self.ra_rad, self.dec_rad)
    }
}

/// Convert a Hipparcos star to a generic Star, optionally propagating proper motion.
///
/// `epoch_year`: Target year for proper motion propagation (e.g. 2025.0).
/// If None, the catalog position at the Hipparcos reference epoch (J1991.25) is used.
///
/// Proper motion near the celestial poles (|dec| > ~87°) is ignored because
/// the cos(dec) divisor becomes numerically unstable.
pub fn star_from_hipparcos(
    star: &crate::catalogs::hipparcos::HipparcosStar,
    epoch_year: Option<f64>,
) -> Star {
    // Hipparcos reference epoch is J1991.25
    const HIPPARCOS_EPOCH_YEAR: f64 = 1991.25;
    // Convert milliarcseconds/year to radians/year
    const MAS_PER_YR_TO_RAD_PER_YR: f64 = std::f64::consts::PI / (180.0 * 3600.0 * 1000.0);

    let ra_rad = star.ra_deg.to_radians();
    let dec_rad = star.dec_deg.to_radians();

    let (ra, dec) = match epoch_year {
        Some(target_year) => {
            let dt_years = target_year - HIPPARCOS_EPOCH_YEAR;
            let cos_dec = dec_rad.cos();
            let (mu_ra, mu_dec) = if cos_dec.abs() > 0.05 {
                // pm_ra is mu_alpha*cos(delta), so divide by cos(dec)
                (
                    star.pm_ra * MAS_PER_YR_TO_RAD_PER_YR / cos_dec,
                    star.pm_dec * MAS_PER_YR_TO_RAD_PER_YR,
                )
            } else {
                (0.0, 0.0)
            };
            (ra_rad + mu_ra * dt_years, dec_rad + mu_dec * dt_years)
        }
        None => (ra_rad, dec_rad),
    };

    Star {
        id: star.hip as u64,
        ra_rad: ra,
        dec_rad: dec,
        mag: star.vmag,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogs::hipparcos::HipparcosStar;

    fn barnard() -> HipparcosStar {
        HipparcosStar {
            hip: 87937,
            vmag: 9.54,
            ra_deg: 269.45402305,
            dec_deg: 4.66828815,
            plx: 549.01,
            pm_ra: -797.84,
            pm_dec: 10326.93,
        }
    }

    #[test]
    fn uvec_is_unit_length() {
        let s = Star::new(1, 1.0, -0.5, 3.0);
        assert!((s.uvec().norm() - 1.0).abs() < 1e-15);
    }

    #[test]
    fn catalog_epoch_keeps_position() {
        let star = star_from_hipparcos(&barnard(), None);
        assert_eq!(star.id, 87937);
        assert!((star.ra_rad.to_degrees() - 269.45402305).abs() < 1e-9);
        assert!((star.mag - 9.54).abs() < 1e-12);
    }

    #[test]
    fn proper_motion_moves_barnards_star_north() {
        let at_epoch = star_from_hipparcos(&barnard(), None);
        let later = star_from_hipparcos(&barnard(), Some(2025.0));
        // ~10.3"/yr over ~34 years is ~348" of declination
        let delta_arcsec = (later.dec_rad - at_epoch.dec_rad).to_degrees() * 3600.0;
        assert!((delta_arcsec - 348.5).abs() < 1.0, "moved {delta_arcsec}\"");
    }
}
