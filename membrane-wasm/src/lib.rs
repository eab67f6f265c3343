use membrane_core::{
    Raster, ResponseDriver, SolveParams, Termination, control_to_voltage,
};
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub struct Mirror {
    driver: ResponseDriver,
    voltages: Vec<i32>,
    wavefront: Vec<f64>,
    max_iterations: Option<usize>,
    tolerance: f64,
}

#[wasm_bindgen]
impl Mirror {
    /// `aperture` and `electrodes` are row-major images of `width` x `height`.
    #[wasm_bindgen(constructor)]
    pub fn new(
        width: usize,
        height: usize,
        aperture: Vec<u8>,
        electrodes: Vec<u8>,
        electrode_count: usize,
    ) -> Result<Mirror, JsValue> {
        let aperture = image_to_raster(width, height, &aperture)?;
        let electrodes = image_to_raster(width, height, &electrodes)?;
        let driver = ResponseDriver::new(&aperture, electrodes, electrode_count).map_err(js_err)?;
        let defaults = SolveParams::default();
        Ok(Mirror {
            driver,
            voltages: vec![0; electrode_count],
            wavefront: vec![0.0; width * height],
            max_iterations: defaults.max_iterations,
            tolerance: defaults.tolerance,
        })
    }

    // Parameters
    pub fn set_voltage(&mut self, electrode: usize, volts: i32) {
        if let Some(v) = self.voltages.get_mut(electrode) {
            *v = volts.clamp(0, 255);
        }
    }
    pub fn set_control(&mut self, electrode: usize, c: f64) {
        self.set_voltage(electrode, control_to_voltage(c));
    }
    pub fn set_max_iterations(&mut self, n: usize) { self.max_iterations = Some(n.max(1)); }
    pub fn set_tolerance(&mut self, tol: f64) { self.tolerance = tol.max(0.0); }

    pub fn electrodes(&self) -> usize { self.driver.electrodes() }
    pub fn width(&self) -> usize { self.driver.shape().0 }
    pub fn height(&self) -> usize { self.driver.shape().1 }

    // Copy-based JS access, row-major like the inputs
    pub fn get_wavefront(&self) -> Vec<f64> {
        self.wavefront.clone()
    }

    // Solve + timing (WASM-only)
    pub fn solve(&mut self) -> Result<SolveInfo, JsValue> {
        let params = SolveParams {
            tolerance: self.tolerance,
            max_iterations: self.max_iterations,
            omega: None,
        };
        let t0 = now_ms();
        let solution = self.driver.respond(&self.voltages, params).map_err(js_err)?;
        let t1 = now_ms();

        let (w, _) = self.driver.shape();
        for ((i, j), &u) in solution.deflection.indexed() {
            self.wavefront[j * w + i] = u;
        }
        Ok(SolveInfo {
            sweeps: solution.sweeps as u32,
            converged: solution.termination == Termination::Converged,
            residual: solution.residual,
            compute_ms: t1 - t0,
        })
    }
}

#[wasm_bindgen]
pub struct SolveInfo {
    sweeps: u32,
    converged: bool,
    residual: f64,
    compute_ms: f64,
}

#[wasm_bindgen]
impl SolveInfo {
    pub fn sweeps(&self) -> u32 { self.sweeps }
    pub fn converged(&self) -> bool { self.converged }
    pub fn residual(&self) -> f64 { self.residual }
    pub fn compute_ms(&self) -> f64 { self.compute_ms }
}

fn image_to_raster(width: usize, height: usize, pixels: &[u8]) -> Result<Raster<u8>, JsValue> {
    if pixels.len() != width * height {
        return Err(JsValue::from_str(&format!(
            "expected {} pixels, got {}",
            width * height,
            pixels.len()
        )));
    }
    Raster::from_fn(width, height, |i, j| pixels[j * width + i]).map_err(js_err)
}

fn js_err(e: membrane_core::MirrorError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn now_ms() -> f64 {
    web_sys::window()
        .and_then(|w| w.performance())
        .map(|p| p.now())
        .unwrap_or(0.0)
}
