/// Tunable thresholds for series clustering and classification
///
/// # Example
///
/// ```
/// use bidsort_core::AnalyzerConfig;
///
/// let config = AnalyzerConfig::default()
///     .min_bold_volumes(100)
///     .propagate_entities(true);
///
/// assert_eq!(config.min_bold_volumes, 100);
/// assert!(config.propagate_entities);
/// assert_eq!(config.echo_time_tolerance_ms, 1.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerConfig {
    /// Functional series with fewer volumes are treated as aborted runs
    pub min_bold_volumes: usize,

    /// Echo times within this window (ms) of a series' first echo time merge into it
    pub echo_time_tolerance_ms: f64,

    /// Minimum echo time (ms) for a "t2" description to count as T2w
    pub t2w_min_echo_time_ms: f64,

    /// Largest b-value still considered a b0 field map
    pub fmap_max_bvalue: f64,

    /// A b0 field map has fewer b-values than this
    pub fmap_max_bvalue_count: usize,

    /// Copy series-level entities onto every object
    pub propagate_entities: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            min_bold_volumes: 50,
            echo_time_tolerance_ms: 1.0,
            t2w_min_echo_time_ms: 100.0,
            fmap_max_bvalue: 50.0,
            fmap_max_bvalue_count: 10,
            propagate_entities: false,
        }
    }
}

impl AnalyzerConfig {
    /// Builder: Set the functional volume-count cutoff
    pub fn min_bold_volumes(mut self, volumes: usize) -> Self {
        self.min_bold_volumes = volumes;
        self
    }

    /// Builder: Set the echo-time merge window
    pub fn echo_time_tolerance_ms(mut self, tolerance: f64) -> Self {
        self.echo_time_tolerance_ms = tolerance;
        self
    }

    /// Builder: Set the T2w echo-time floor
    pub fn t2w_min_echo_time_ms(mut self, echo_time: f64) -> Self {
        self.t2w_min_echo_time_ms = echo_time;
        self
    }

    /// Builder: Set the b0 field map limits
    pub fn fmap_bvalue_limits(mut self, max_bvalue: f64, max_count: usize) -> Self {
        self.fmap_max_bvalue = max_bvalue;
        self.fmap_max_bvalue_count = max_count;
        self
    }

    /// Builder: Copy series entities down to objects
    ///
    /// # Example
    ///
    /// ```
    /// use bidsort_core::AnalyzerConfig;
    ///
    /// let config = AnalyzerConfig::default().propagate_entities(true);
    /// assert!(config.propagate_entities);
    /// ```
    pub fn propagate_entities(mut self, propagate: bool) -> Self {
        self.propagate_entities = propagate;
        self
    }
}
