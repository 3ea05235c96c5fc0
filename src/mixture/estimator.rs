//! Estimator facade: configure, fit by model selection, then predict.

use crate::mixture::error::{MixtureError, MixtureResult};
use crate::mixture::impl_generic::validate_selection_options;
use crate::mixture::traits::criterion::InformationCriterion;
use crate::mixture::traits::gmm::{CovarianceType, GmmAlgorithms, GmmInit, GmmModel};
use crate::mixture::traits::selection::{
    CandidateScore, CovarianceTypeSpec, GmmSelection, GmmSelectionAlgorithms, GmmSelectionOptions,
};
use crate::mixture::validation::{validate_data_2d, validate_labels};
use numr::runtime::Runtime;
use numr::tensor::Tensor;

/// A dynamically typed configuration value for [`GaussianMixtureIc::set_param`].
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    None,
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<String>),
}

impl ParamValue {
    fn kind(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::List(_) => "list",
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<Vec<&str>> for ParamValue {
    fn from(v: Vec<&str>) -> Self {
        Self::List(v.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(v: Vec<String>) -> Self {
        Self::List(v)
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::None, Into::into)
    }
}

fn type_error(parameter: &str, expected: &'static str, found: &ParamValue) -> MixtureError {
    MixtureError::InvalidParameterType {
        parameter: parameter.to_string(),
        expected,
        found: found.kind(),
    }
}

fn as_count(parameter: &str, value: &ParamValue) -> MixtureResult<usize> {
    match value {
        ParamValue::Int(v) => usize::try_from(*v).map_err(|_| {
            MixtureError::invalid_parameter(parameter, format!("must be non-negative, got {v}"))
        }),
        other => Err(type_error(parameter, "integer", other)),
    }
}

fn as_float(parameter: &str, value: &ParamValue) -> MixtureResult<f64> {
    match value {
        ParamValue::Float(v) => Ok(*v),
        ParamValue::Int(v) => Ok(*v as f64),
        other => Err(type_error(parameter, "number", other)),
    }
}

fn as_str<'a>(parameter: &str, value: &'a ParamValue) -> MixtureResult<&'a str> {
    match value {
        ParamValue::Str(s) => Ok(s),
        other => Err(type_error(parameter, "string", other)),
    }
}

/// Gaussian mixture estimator that picks its component count and covariance
/// structure by an information criterion.
///
/// `fit` searches every `(n_components, covariance_type)` pair in the
/// configured range and keeps the model with the lowest criterion value.
/// A failed `fit` leaves the previously fitted state untouched.
#[derive(Debug, Clone)]
pub struct GaussianMixtureIc<R: Runtime> {
    options: GmmSelectionOptions,
    fitted: Option<GmmSelection<R>>,
}

impl<R: Runtime> Default for GaussianMixtureIc<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Runtime> GaussianMixtureIc<R> {
    /// Unfitted estimator with default options.
    pub fn new() -> Self {
        Self::with_options(GmmSelectionOptions::default())
    }

    /// Unfitted estimator with the given options. Options are validated at `fit`.
    pub fn with_options(options: GmmSelectionOptions) -> Self {
        Self {
            options,
            fitted: None,
        }
    }

    pub fn options(&self) -> &GmmSelectionOptions {
        &self.options
    }

    /// Set one option by name.
    ///
    /// Values of the wrong kind fail with [`MixtureError::InvalidParameterType`];
    /// values of the right kind that are out of range or unrecognized fail with
    /// [`MixtureError::InvalidParameter`]. Range checks that depend on the data
    /// (component counts against the sample count) run at `fit`.
    pub fn set_param(
        &mut self,
        name: &str,
        value: impl Into<ParamValue>,
    ) -> MixtureResult<&mut Self> {
        let value = value.into();
        match name {
            "min_components" => self.options.min_components = as_count(name, &value)?,
            "max_components" => self.options.max_components = as_count(name, &value)?,
            "n_init" => self.options.n_init = as_count(name, &value)?,
            "max_iter" => self.options.max_iter = as_count(name, &value)?,
            "n_jobs" => match value {
                ParamValue::Int(v) => {
                    self.options.n_jobs = isize::try_from(v).map_err(|_| {
                        MixtureError::invalid_parameter(name, format!("out of range: {v}"))
                    })?;
                }
                ref other => return Err(type_error(name, "integer", other)),
            },
            "covariance_type" => {
                self.options.covariance_types = match &value {
                    ParamValue::Str(s) => s.parse::<CovarianceTypeSpec>()?,
                    ParamValue::List(items) => CovarianceTypeSpec::parse_list(items)?,
                    other => return Err(type_error(name, "string or list of strings", other)),
                };
            }
            "criterion" => {
                self.options.criterion = as_str(name, &value)?.parse::<InformationCriterion>()?;
            }
            "init_params" => self.options.init = as_str(name, &value)?.parse::<GmmInit>()?,
            "random_state" => {
                self.options.random_state = match value {
                    ParamValue::None => None,
                    ParamValue::Int(v) => Some(u64::try_from(v).map_err(|_| {
                        MixtureError::invalid_parameter(
                            name,
                            format!("must be non-negative, got {v}"),
                        )
                    })?),
                    ref other => return Err(type_error(name, "integer or none", other)),
                };
            }
            "tol" => self.options.tol = as_float(name, &value)?,
            "reg_covar" => self.options.reg_covar = as_float(name, &value)?,
            other => {
                return Err(MixtureError::invalid_parameter(
                    other,
                    "unknown parameter",
                ));
            }
        }
        Ok(self)
    }

    /// Run model selection on `data` [n, d] and keep the winner.
    ///
    /// `labels` are accepted for interface compatibility and only checked for
    /// shape; they never influence the search.
    pub fn fit<C>(
        &mut self,
        client: &C,
        data: &Tensor<R>,
        labels: Option<&Tensor<R>>,
    ) -> MixtureResult<&mut Self>
    where
        C: GmmSelectionAlgorithms<R>,
    {
        validate_data_2d(data.shape(), "GaussianMixtureIc::fit")?;
        let n_samples = data.shape()[0];
        validate_selection_options(&self.options, n_samples)?;
        if let Some(labels) = labels {
            validate_labels(labels.shape(), labels.dtype(), n_samples, "GaussianMixtureIc::fit")?;
        }

        let selection = client.gmm_select(data, &self.options)?;
        self.fitted = Some(selection);
        Ok(self)
    }

    /// Most likely component of each row [n] I64.
    pub fn predict<C>(&self, client: &C, data: &Tensor<R>) -> MixtureResult<Tensor<R>>
    where
        C: GmmAlgorithms<R>,
    {
        client.gmm_predict(self.fitted_model("predict")?, data)
    }

    /// Component membership probabilities [n, k].
    pub fn predict_proba<C>(&self, client: &C, data: &Tensor<R>) -> MixtureResult<Tensor<R>>
    where
        C: GmmAlgorithms<R>,
    {
        client.gmm_predict_proba(self.fitted_model("predict_proba")?, data)
    }

    /// `fit` followed by `predict` on the same data.
    pub fn fit_predict<C>(
        &mut self,
        client: &C,
        data: &Tensor<R>,
        labels: Option<&Tensor<R>>,
    ) -> MixtureResult<Tensor<R>>
    where
        C: GmmSelectionAlgorithms<R> + GmmAlgorithms<R>,
    {
        self.fit(client, data, labels)?;
        self.predict(client, data)
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    /// Full search outcome of the last successful fit.
    pub fn selection(&self) -> Option<&GmmSelection<R>> {
        self.fitted.as_ref()
    }

    /// Component count of the selected model.
    pub fn n_components(&self) -> MixtureResult<usize> {
        Ok(self.fitted_selection("n_components")?.n_components())
    }

    /// Covariance structure of the selected model.
    pub fn covariance_type(&self) -> MixtureResult<CovarianceType> {
        Ok(self.fitted_selection("covariance_type")?.covariance_type())
    }

    /// Parameters of the selected model.
    pub fn best_model(&self) -> MixtureResult<&GmmModel<R>> {
        self.fitted_model("best_model")
    }

    /// Criterion value of every grid point, in search order.
    pub fn criterion_scores(&self) -> MixtureResult<&[CandidateScore]> {
        Ok(&self.fitted_selection("criterion_scores")?.scores)
    }

    fn fitted_selection(&self, operation: &'static str) -> MixtureResult<&GmmSelection<R>> {
        self.fitted
            .as_ref()
            .ok_or(MixtureError::NotFitted { operation })
    }

    fn fitted_model(&self, operation: &'static str) -> MixtureResult<&GmmModel<R>> {
        Ok(&self.fitted_selection(operation)?.best.model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mixture::test_support::{
        expect_err, five_blobs, setup, two_blobs, two_shaped_blobs,
    };
    use crate::mixture::traits::metrics::ClusterMetricsAlgorithms;
    use approx::assert_relative_eq;
    use numr::runtime::cpu::{CpuClient, CpuDevice, CpuRuntime};

    type Estimator = GaussianMixtureIc<CpuRuntime>;

    #[test]
    fn test_predict_before_fit() {
        let (client, device) = setup();
        let data = two_blobs(0).data(&device);
        let est = Estimator::new();

        let err = expect_err(est.predict(&client, &data));
        assert_eq!(err, MixtureError::NotFitted { operation: "predict" });
        assert!(est.predict_proba(&client, &data).is_err());
        assert!(est.n_components().is_err());
        assert!(est.best_model().is_err());
        assert!(!est.is_fitted());
    }

    #[test]
    fn test_set_param_type_errors() {
        let mut est = Estimator::new();

        for name in ["min_components", "max_components", "n_init", "max_iter", "n_jobs"] {
            let err = expect_err(est.set_param(name, "1"));
            assert!(
                matches!(err, MixtureError::InvalidParameterType { .. }),
                "{name}: {err}"
            );
        }
        assert!(matches!(
            expect_err(est.set_param("covariance_type", 1)),
            MixtureError::InvalidParameterType { .. }
        ));
        assert!(matches!(
            expect_err(est.set_param("criterion", 1.5)),
            MixtureError::InvalidParameterType { .. }
        ));
        assert!(matches!(
            expect_err(est.set_param("random_state", "seed")),
            MixtureError::InvalidParameterType { .. }
        ));
        assert!(matches!(
            expect_err(est.set_param("tol", "small")),
            MixtureError::InvalidParameterType { .. }
        ));
    }

    #[test]
    fn test_set_param_value_errors() {
        let mut est = Estimator::new();

        let value_errors = [
            expect_err(est.set_param("covariance_type", "1")),
            expect_err(est.set_param("covariance_type", vec!["full", "banana"])),
            expect_err(est.set_param("covariance_type", Vec::<String>::new())),
            expect_err(est.set_param("criterion", "cic")),
            expect_err(est.set_param("init_params", "magic")),
            expect_err(est.set_param("n_init", -1)),
            expect_err(est.set_param("random_state", -3)),
            expect_err(est.set_param("no_such_option", 1)),
        ];
        for err in value_errors {
            assert!(matches!(err, MixtureError::InvalidParameter { .. }), "{err}");
        }
    }

    #[test]
    fn test_set_param_applies_values() {
        let mut est = Estimator::new();
        est.set_param("min_components", 1)
            .unwrap()
            .set_param("max_components", 4)
            .unwrap()
            .set_param("covariance_type", vec!["tied", "spherical", "tied"])
            .unwrap()
            .set_param("criterion", "aic")
            .unwrap()
            .set_param("random_state", Some(7i64))
            .unwrap()
            .set_param("reg_covar", 0)
            .unwrap()
            .set_param("init_params", "random")
            .unwrap();

        let options = est.options();
        assert_eq!(options.min_components, 1);
        assert_eq!(options.max_components, 4);
        assert_eq!(
            options.covariance_types.resolve().unwrap(),
            vec![CovarianceType::Spherical, CovarianceType::Tied]
        );
        assert_eq!(options.criterion, InformationCriterion::Aic);
        assert_eq!(options.random_state, Some(7));
        assert_eq!(options.reg_covar, 0.0);
        assert_eq!(options.init, GmmInit::Random);

        est.set_param("covariance_type", "all").unwrap();
        assert_eq!(est.options().covariance_types, CovarianceTypeSpec::All);
        est.set_param("random_state", ParamValue::None).unwrap();
        assert_eq!(est.options().random_state, None);
    }

    #[test]
    fn test_fit_rejects_bad_ranges() {
        let (client, device) = setup();
        let data = two_blobs(1).data(&device);
        let n = 200i64;

        let cases: [(i64, i64); 4] = [(0, 3), (1, 0), (1, n + 1), (n + 1, n + 2)];
        for (min, max) in cases {
            let mut est = Estimator::new();
            est.set_param("min_components", min)
                .unwrap()
                .set_param("max_components", max)
                .unwrap();
            let err = expect_err(est.fit(&client, &data, None));
            assert!(
                matches!(err, MixtureError::InvalidParameter { .. }),
                "({min}, {max}): {err}"
            );
        }

        let mut est = Estimator::new();
        est.set_param("n_init", 0).unwrap();
        assert!(expect_err(est.fit(&client, &data, None)).is_configuration_error());
    }

    #[test]
    fn test_fit_checks_labels() {
        let (client, device) = setup();
        let blobs = two_blobs(2);
        let data = blobs.data(&device);
        let short = Tensor::<CpuRuntime>::from_slice(&[0i64, 1, 0], &[3], &device);

        let mut est = Estimator::new();
        let err = expect_err(est.fit(&client, &data, Some(&short)));
        assert!(matches!(err, MixtureError::InvalidInput { .. }));
        assert!(!est.is_fitted());
    }

    #[test]
    fn test_two_blobs_recovered() {
        let (client, device) = setup();
        let blobs = two_blobs(3);
        let data = blobs.data(&device);
        let truth = blobs.labels(&device);

        let mut est = Estimator::new();
        est.set_param("max_components", 5)
            .unwrap()
            .set_param("criterion", "bic")
            .unwrap()
            .set_param("random_state", 0)
            .unwrap();

        let predicted = est.fit_predict(&client, &data, Some(&truth)).unwrap();
        assert_eq!(est.n_components().unwrap(), 2);
        // Components 2..=5 times four covariance types.
        assert_eq!(est.criterion_scores().unwrap().len(), 16);

        let ari: f64 = client
            .adjusted_rand_score(&truth, &predicted)
            .unwrap()
            .item()
            .unwrap();
        assert_relative_eq!(ari, 1.0, epsilon = 1e-12);

        let proba = est.predict_proba(&client, &data).unwrap();
        assert_eq!(proba.shape(), &[200, 2]);
    }

    #[test]
    fn test_two_blobs_aic_within_range() {
        let (client, device) = setup();
        let data = two_blobs(4).data(&device);

        let mut est = Estimator::new();
        est.set_param("max_components", 5)
            .unwrap()
            .set_param("criterion", "aic")
            .unwrap()
            .set_param("random_state", 0)
            .unwrap();
        est.fit(&client, &data, None).unwrap();

        let k = est.n_components().unwrap();
        assert!((2..=5).contains(&k));
        assert_eq!(est.selection().unwrap().criterion, InformationCriterion::Aic);
    }

    #[test]
    fn test_five_blobs_recovered() {
        let (client, device) = setup();
        let data = five_blobs(5).data(&device);

        let mut est = Estimator::new();
        est.set_param("min_components", 3)
            .unwrap()
            .set_param("max_components", 10)
            .unwrap()
            .set_param("criterion", "bic")
            .unwrap()
            .set_param("random_state", 0)
            .unwrap();
        est.fit(&client, &data, None).unwrap();
        assert_eq!(est.n_components().unwrap(), 5);
    }

    #[test]
    fn test_five_blobs_aic_within_range() {
        let (client, device) = setup();
        let data = five_blobs(8).data(&device);

        let mut est = Estimator::new();
        est.set_param("min_components", 3)
            .unwrap()
            .set_param("max_components", 10)
            .unwrap()
            .set_param("criterion", "aic")
            .unwrap()
            .set_param("random_state", 0)
            .unwrap();
        est.fit(&client, &data, None).unwrap();

        let k = est.n_components().unwrap();
        assert!((3..=10).contains(&k));
    }

    fn fit_shaped(
        client: &CpuClient,
        device: &CpuDevice,
        seed: u64,
        first: [[f64; 2]; 2],
        second: [[f64; 2]; 2],
    ) -> Estimator {
        let data = two_shaped_blobs(seed, first, second).data(device);
        let mut est = Estimator::new();
        est.set_param("random_state", 0).unwrap();
        est.fit(client, &data, None).unwrap();
        est
    }

    #[test]
    fn test_covariance_structure_recovered() {
        let (client, device) = setup();

        let cases = [
            (
                CovarianceType::Spherical,
                [[2.0, 0.0], [0.0, 2.0]],
                [[2.0, 0.0], [0.0, 2.0]],
            ),
            (
                CovarianceType::Tied,
                [[2.0, 1.0], [1.0, 2.0]],
                [[2.0, 1.0], [1.0, 2.0]],
            ),
            (
                CovarianceType::Full,
                [[2.0, -1.0], [-1.0, 2.0]],
                [[2.0, 1.0], [1.0, 2.0]],
            ),
        ];

        for (expected, first, second) in cases {
            let est = fit_shaped(&client, &device, 6, first, second);
            assert_eq!(est.n_components().unwrap(), 2, "{expected}");
            assert_eq!(est.covariance_type().unwrap(), expected);
        }
    }

    #[test]
    fn test_diagonal_structure_recovered() {
        let (client, device) = setup();
        let first = [[1.0, 0.0], [0.0, 1.0]];
        let second = [[2.0, 0.0], [0.0, 1.0]];

        // Only one variance differs, so some draws favor the cheaper spherical fit.
        let mut recovered = 0;
        for seed in 0..8 {
            let est = fit_shaped(&client, &device, seed, first, second);
            if est.n_components().unwrap() == 2
                && est.covariance_type().unwrap() == CovarianceType::Diagonal
            {
                recovered += 1;
            }
        }
        assert!(recovered > 0);
    }

    #[test]
    fn test_failed_fit_keeps_previous_model() {
        let (client, device) = setup();
        let data = two_blobs(7).data(&device);

        let mut est = Estimator::new();
        est.set_param("max_components", 3)
            .unwrap()
            .set_param("random_state", 0)
            .unwrap();
        est.fit(&client, &data, None).unwrap();
        let before = est.n_components().unwrap();

        let tiny = Tensor::<CpuRuntime>::from_slice(&[0.0, 1.0, 2.0, 3.0], &[2, 2], &device);
        assert!(est.fit(&client, &tiny, None).is_err());
        assert!(est.is_fitted());
        assert_eq!(est.n_components().unwrap(), before);
    }
}
