//! Validation helpers for mixture fitting and model selection.

use crate::mixture::error::{MixtureError, MixtureResult};
use numr::dtype::DType;

/// Validate data dtype (must be F32 or F64).
pub fn validate_mixture_dtype(dtype: DType, op: &'static str) -> MixtureResult<()> {
    match dtype {
        DType::F32 | DType::F64 => Ok(()),
        _ => Err(MixtureError::InvalidInput {
            context: format!("{op} requires F32 or F64 data, got {dtype:?}"),
        }),
    }
}

/// Validate that data is 2D [n, d] with at least one row and one feature.
pub fn validate_data_2d(shape: &[usize], op: &'static str) -> MixtureResult<()> {
    if shape.len() != 2 {
        return Err(MixtureError::InvalidInput {
            context: format!("{op} requires 2D data [n, d], got {}-D", shape.len()),
        });
    }
    if shape[0] == 0 || shape[1] == 0 {
        return Err(MixtureError::InvalidInput {
            context: format!("{op} requires non-empty data, got shape {shape:?}"),
        });
    }
    Ok(())
}

/// Validate a fixed component count against the number of samples.
pub fn validate_n_components(
    n_components: usize,
    n_samples: usize,
    op: &'static str,
) -> MixtureResult<()> {
    if n_components == 0 {
        return Err(MixtureError::invalid_parameter(
            "n_components",
            format!("{op} requires n_components >= 1"),
        ));
    }
    if n_components > n_samples {
        return Err(MixtureError::invalid_parameter(
            "n_components",
            format!("{op}: n_components={n_components} exceeds number of samples {n_samples}"),
        ));
    }
    Ok(())
}

/// Validate the search range `[min_components, max_components]` against the sample count.
pub fn validate_component_range(
    min_components: usize,
    max_components: usize,
    n_samples: usize,
) -> MixtureResult<()> {
    if min_components < 1 {
        return Err(MixtureError::invalid_parameter(
            "min_components",
            format!("must be >= 1, got {min_components}"),
        ));
    }
    if min_components > n_samples {
        return Err(MixtureError::invalid_parameter(
            "min_components",
            format!("must be <= n_samples={n_samples}, got {min_components}"),
        ));
    }
    if max_components < min_components {
        return Err(MixtureError::invalid_parameter(
            "max_components",
            format!("must be >= min_components={min_components}, got {max_components}"),
        ));
    }
    if max_components > n_samples {
        return Err(MixtureError::invalid_parameter(
            "max_components",
            format!("must be <= n_samples={n_samples}, got {max_components}"),
        ));
    }
    Ok(())
}

/// Validate the EM controls shared by the fitter and the selector.
pub fn validate_em_controls(
    n_init: usize,
    max_iter: usize,
    tol: f64,
    reg_covar: f64,
) -> MixtureResult<()> {
    if n_init < 1 {
        return Err(MixtureError::invalid_parameter(
            "n_init",
            format!("must be >= 1, got {n_init}"),
        ));
    }
    if max_iter < 1 {
        return Err(MixtureError::invalid_parameter(
            "max_iter",
            format!("must be >= 1, got {max_iter}"),
        ));
    }
    if !(tol.is_finite() && tol > 0.0) {
        return Err(MixtureError::invalid_parameter(
            "tol",
            format!("must be finite and > 0, got {tol}"),
        ));
    }
    if !(reg_covar.is_finite() && reg_covar >= 0.0) {
        return Err(MixtureError::invalid_parameter(
            "reg_covar",
            format!("must be finite and >= 0, got {reg_covar}"),
        ));
    }
    Ok(())
}

/// Validate labels tensor is 1D I64 with one entry per sample.
pub fn validate_labels(
    shape: &[usize],
    dtype: DType,
    n_samples: usize,
    op: &'static str,
) -> MixtureResult<()> {
    if shape.len() != 1 {
        return Err(MixtureError::InvalidInput {
            context: format!("{op} requires 1D labels, got {}-D", shape.len()),
        });
    }
    if dtype != DType::I64 {
        return Err(MixtureError::InvalidInput {
            context: format!("{op} requires I64 labels, got {dtype:?}"),
        });
    }
    if shape[0] != n_samples {
        return Err(MixtureError::InvalidInput {
            context: format!(
                "{op}: {} labels given for {n_samples} samples",
                shape[0]
            ),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_mixture_dtype() {
        assert!(validate_mixture_dtype(DType::F32, "test").is_ok());
        assert!(validate_mixture_dtype(DType::F64, "test").is_ok());
        assert!(validate_mixture_dtype(DType::I64, "test").is_err());
    }

    #[test]
    fn test_validate_data_2d() {
        assert!(validate_data_2d(&[10, 3], "test").is_ok());
        assert!(validate_data_2d(&[10], "test").is_err());
        assert!(validate_data_2d(&[0, 3], "test").is_err());
        assert!(validate_data_2d(&[10, 0], "test").is_err());
    }

    #[test]
    fn test_validate_component_range() {
        assert!(validate_component_range(1, 5, 100).is_ok());
        assert!(validate_component_range(3, 3, 3).is_ok());

        let err = validate_component_range(0, 5, 100).unwrap_err();
        assert!(err.is_configuration_error());
        assert!(matches!(
            err,
            MixtureError::InvalidParameter { ref parameter, .. } if parameter == "min_components"
        ));

        let err = validate_component_range(2, 1, 100).unwrap_err();
        assert!(matches!(
            err,
            MixtureError::InvalidParameter { ref parameter, .. } if parameter == "max_components"
        ));

        assert!(validate_component_range(1, 101, 100).is_err());
        assert!(validate_component_range(101, 102, 100).is_err());
    }

    #[test]
    fn test_validate_em_controls() {
        assert!(validate_em_controls(1, 100, 1e-3, 1e-6).is_ok());
        assert!(validate_em_controls(1, 100, 1e-3, 0.0).is_ok());
        assert!(validate_em_controls(0, 100, 1e-3, 1e-6).is_err());
        assert!(validate_em_controls(1, 0, 1e-3, 1e-6).is_err());
        assert!(validate_em_controls(1, 100, 0.0, 1e-6).is_err());
        assert!(validate_em_controls(1, 100, f64::NAN, 1e-6).is_err());
        assert!(validate_em_controls(1, 100, 1e-3, -1.0).is_err());
    }

    #[test]
    fn test_validate_labels() {
        assert!(validate_labels(&[4], DType::I64, 4, "test").is_ok());
        assert!(validate_labels(&[4, 1], DType::I64, 4, "test").is_err());
        assert!(validate_labels(&[4], DType::F64, 4, "test").is_err());
        assert!(validate_labels(&[3], DType::I64, 4, "test").is_err());
    }
}
