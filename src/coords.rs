//! Ordinate text decoding for `pos`, `posList` and legacy `coordinates`.

use crate::{
    error::{Error, Result},
    geometry::Coord,
};

/// Separators of a GML 2 `coordinates` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TupleFormat {
    pub decimal: String,
    pub cs: String,
    pub ts: String,
}

impl Default for TupleFormat {
    fn default() -> Self {
        Self {
            decimal: ".".to_string(),
            cs: ",".to_string(),
            ts: " ".to_string(),
        }
    }
}

fn ordinate(token: &str) -> Result<f64> {
    token
        .parse::<f64>()
        .map_err(|_| Error::InvalidOrdinate(token.to_string()))
}

fn build(ordinates: &[f64], swap_xy: bool) -> Coord {
    let (x, y) = if swap_xy {
        (ordinates[1], ordinates[0])
    } else {
        (ordinates[0], ordinates[1])
    };
    Coord {
        x,
        y,
        z: ordinates.get(2).copied(),
    }
}

/// Splits whitespace separated ordinates into coordinates of `dimension`
/// ordinates each. Ordinates beyond the third are dropped.
///
/// # Errors
///
/// Fails with [`Error::DimensionMismatch`] if the token count is not a
/// multiple of `dimension`, and [`Error::InvalidOrdinate`] on non-numeric
/// tokens.
pub fn decode(text: &str, dimension: usize, swap_xy: bool) -> Result<Vec<Coord>> {
    if dimension < 2 {
        return Err(Error::DimensionMismatch {
            ordinates: 0,
            dimension,
        });
    }
    let ordinates = text
        .split_whitespace()
        .map(ordinate)
        .collect::<Result<Vec<_>>>()?;
    if ordinates.len() % dimension != 0 {
        return Err(Error::DimensionMismatch {
            ordinates: ordinates.len(),
            dimension,
        });
    }
    Ok(ordinates
        .chunks_exact(dimension)
        .map(|chunk| build(&chunk[..dimension.min(3)], swap_xy))
        .collect())
}

/// Decodes GML 2 tuple text such as `1,2 3,4`.
///
/// A z ordinate is kept only when `dimension` is above 2 and the tuple
/// carries one.
///
/// # Errors
///
/// Fails with [`Error::DimensionMismatch`] on tuples with fewer than two
/// ordinates, and [`Error::InvalidOrdinate`] on non-numeric ordinates.
pub fn decode_tuples(
    text: &str,
    format: &TupleFormat,
    dimension: usize,
    swap_xy: bool,
) -> Result<Vec<Coord>> {
    let text = text.replace(['\n', '\r', '\t'], " ");
    let tuple_sep = if format.ts.trim().is_empty() {
        " "
    } else {
        format.ts.as_str()
    };

    text.split(tuple_sep)
        .filter(|tuple| !tuple.trim().is_empty())
        .map(|tuple| {
            let ordinates = tuple
                .split(format.cs.as_str())
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(|o| {
                    if format.decimal == "." {
                        ordinate(o)
                    } else {
                        ordinate(&o.replace(format.decimal.as_str(), "."))
                    }
                })
                .collect::<Result<Vec<_>>>()?;
            if ordinates.len() < 2 {
                return Err(Error::DimensionMismatch {
                    ordinates: ordinates.len(),
                    dimension,
                });
            }
            let keep = if dimension > 2 { ordinates.len().min(3) } else { 2 };
            Ok(build(&ordinates[..keep], swap_xy))
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::ErrorKind;
    use approx::assert_relative_eq;

    #[test]
    fn test_count_matches_dimension() -> Result<()> {
        let text = "0 0 4 0 4 4 0 4 0 0";
        assert_eq!(decode(text, 2, false)?.len(), 5);

        let coords = decode("1 2 3\n4 5 6", 3, false)?;
        assert_eq!(coords.len(), 2);
        assert_eq!(coords[1], Coord::xyz(4.0, 5.0, 6.0));
        Ok(())
    }

    #[test]
    fn test_indivisible_token_count() {
        for (text, dimension) in [("0 0 1 1 2", 2), ("0 0 1 1", 3), ("1", 2)] {
            let err = decode(text, dimension, false).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::DimensionMismatch, "{text}");
        }
    }

    #[test]
    fn test_empty_text_yields_no_coordinates() -> Result<()> {
        assert!(decode("   ", 2, false)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_swap_axes() -> Result<()> {
        let coords = decode("52.5 13.4", 2, true)?;
        assert_relative_eq!(coords[0].x, 13.4);
        assert_relative_eq!(coords[0].y, 52.5);
        Ok(())
    }

    #[test]
    fn test_non_numeric_ordinate() {
        let err = decode("1 north", 2, false).unwrap_err();
        assert!(matches!(err, Error::InvalidOrdinate(ref t) if t == "north"));
    }

    #[test]
    fn test_default_tuples() -> Result<()> {
        let coords = decode_tuples("0,0 10,0\n10,10", &TupleFormat::default(), 2, false)?;
        assert_eq!(
            coords,
            vec![Coord::xy(0.0, 0.0), Coord::xy(10.0, 0.0), Coord::xy(10.0, 10.0)]
        );
        Ok(())
    }

    #[test]
    fn test_custom_separators() -> Result<()> {
        let format = TupleFormat {
            decimal: ",".to_string(),
            cs: ";".to_string(),
            ts: "|".to_string(),
        };
        let coords = decode_tuples("1,5;2,5;3|4;5;6", &format, 3, false)?;
        assert_eq!(coords.len(), 2);
        assert_relative_eq!(coords[0].x, 1.5);
        assert_eq!(coords[0].z, Some(3.0));
        assert_eq!(coords[1], Coord::xyz(4.0, 5.0, 6.0));
        Ok(())
    }

    #[test]
    fn test_tuple_z_dropped_in_two_dimensions() -> Result<()> {
        let coords = decode_tuples("1,2,3", &TupleFormat::default(), 2, false)?;
        assert_eq!(coords, vec![Coord::xy(1.0, 2.0)]);
        Ok(())
    }
}
