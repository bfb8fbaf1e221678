//! Fluent builder for assembling and starting an [`Engine`].

use attacca_engine::{
    AudioDriver, CallbackSink, Engine, EngineOptions, ProcessMode, Result, TransportMode,
};

/// Builds an [`Engine`] from options, a driver choice and an optional
/// callback sink, then starts it.
///
/// # Example
///
/// ```ignore
/// let engine = EngineBuilder::new()
///     .process_mode(ProcessMode::Patchbay)
///     .sample_rate(48000)
///     .buffer_size(256)
///     .driver_name("null")
///     .build()?;
/// ```
pub struct EngineBuilder {
    options: EngineOptions,
    client_name: String,
    driver: Option<Box<dyn AudioDriver>>,
    driver_name: String,
    callback: Option<CallbackSink>,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            options: EngineOptions::default(),
            client_name: "attacca".to_owned(),
            driver: None,
            driver_name: attacca_engine::NULL_DRIVER_NAME.to_owned(),
            callback: None,
        }
    }

    pub fn process_mode(mut self, mode: ProcessMode) -> Self {
        self.options.process_mode = mode;
        self
    }

    pub fn transport_mode(mut self, mode: TransportMode) -> Self {
        self.options.transport_mode = mode;
        self
    }

    pub fn sample_rate(mut self, rate: u32) -> Self {
        self.options.audio_sample_rate = rate;
        self
    }

    pub fn buffer_size(mut self, frames: u32) -> Self {
        self.options.audio_buffer_size = frames;
        self
    }

    pub fn force_stereo(mut self, force: bool) -> Self {
        self.options.force_stereo = force;
        self
    }

    pub fn max_parameters(mut self, max: u32) -> Self {
        self.options.max_parameters = max;
        self
    }

    pub fn ui_bridges_timeout(mut self, millis: u32) -> Self {
        self.options.ui_bridges_timeout = millis;
        self
    }

    /// Replace the whole option block.
    pub fn options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = name.into();
        self
    }

    /// Use a caller-supplied backend instead of a compiled-in one.
    pub fn driver(mut self, driver: Box<dyn AudioDriver>) -> Self {
        self.driver = Some(driver);
        self
    }

    /// Select a compiled-in backend by name.
    pub fn driver_name(mut self, name: impl Into<String>) -> Self {
        self.driver_name = name.into();
        self
    }

    pub fn callback(mut self, sink: CallbackSink) -> Self {
        self.callback = Some(sink);
        self
    }

    /// Create the engine and bring the driver up.
    pub fn build(self) -> Result<Engine> {
        self.options.validate()?;
        let engine = Engine::new(self.options);
        if let Some(sink) = self.callback {
            engine.set_callback(Some(sink));
        }

        tracing::debug!(client = %self.client_name, "starting engine");
        match self.driver {
            Some(driver) => engine.init_with_driver(driver, &self.client_name)?,
            None => engine.init(&self.driver_name, &self.client_name)?,
        }
        Ok(engine)
    }
}
