use wasm_bindgen::prelude::*;
use web_sys::console;

use crate::autofill::{grid_stats, AutoFill, GridStats};
use crate::grid_config::Grid;

/// The outcome of `autoFillGrid`, with the filled grid rendered back to template form.
#[wasm_bindgen(getter_with_clone)]
pub struct WasmFillResult {
    pub success: bool,
    pub message: String,
    pub grid: String,
}

#[wasm_bindgen(js_name = GridStats)]
pub struct WasmGridStats {
    #[wasm_bindgen(js_name = totalWords)]
    pub total_words: usize,
    #[wasm_bindgen(js_name = filledWords)]
    pub filled_words: usize,
    #[wasm_bindgen(js_name = emptyWords)]
    pub empty_words: usize,
    #[wasm_bindgen(js_name = completionPercentage)]
    pub completion_percentage: u32,
}

impl From<GridStats> for WasmGridStats {
    fn from(stats: GridStats) -> Self {
        WasmGridStats {
            total_words: stats.total_words,
            filled_words: stats.filled_words,
            empty_words: stats.empty_words,
            completion_percentage: stats.completion_percentage,
        }
    }
}

fn parse_grid(template: &str) -> Result<Grid, JsValue> {
    Grid::from_template(template).map_err(|error| JsValue::from_str(&error.to_string()))
}

#[wasm_bindgen]
pub struct WasmAutoFill {
    inner: AutoFill,
}

#[wasm_bindgen]
impl WasmAutoFill {
    #[wasm_bindgen(constructor)]
    #[allow(clippy::new_without_default)]
    pub fn new() -> WasmAutoFill {
        #[cfg(feature = "console_error_panic_hook")]
        crate::set_panic_hook();

        WasmAutoFill {
            inner: AutoFill::default(),
        }
    }

    /// Load word list entries like `"CAT;10"`, replacing any previous list.
    #[wasm_bindgen(js_name = setWordList)]
    pub fn set_word_list(&mut self, entries: Vec<String>) {
        self.inner.set_word_list(entries.as_slice());
        if let Some(word_list) = self.inner.word_list() {
            console::log_1(&JsValue::from_str(&format!(
                "Auto-fill loaded with {} words",
                word_list.len()
            )));
            for error in &word_list.errors {
                console::warn_1(&JsValue::from_str(&error.to_string()));
            }
        }
    }

    #[wasm_bindgen(js_name = autoFillGrid)]
    pub fn auto_fill_grid(&mut self, template: &str) -> Result<WasmFillResult, JsValue> {
        let mut grid = parse_grid(template)?;
        let result = self
            .inner
            .auto_fill_grid(&mut grid)
            .map_err(|error| JsValue::from_str(&error.to_string()))?;

        let statistics = self.inner.statistics();
        console::log_1(&JsValue::from_str(&format!(
            "Fill finished in {:?}: {} states, {} backtracks, {} retries",
            statistics.total_time, statistics.states, statistics.backtracks, statistics.retries
        )));

        Ok(WasmFillResult {
            success: result.success,
            message: result.message,
            grid: grid.render(),
        })
    }

    #[wasm_bindgen(js_name = getGridStats)]
    pub fn get_grid_stats(&self, template: &str) -> Result<WasmGridStats, JsValue> {
        Ok(grid_stats(&parse_grid(template)?).into())
    }
}
