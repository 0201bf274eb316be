use std::any::Any;
use std::panic::AssertUnwindSafe;

use formats::{EraDefinition, ShapeSpec, decode_archive};
use futures_util::FutureExt;
use futures_util::future::join_all;
use layers::{LoadedLayer, LoadedShape};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::fetch::ArchiveFetcher;

#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// One entry per definition, in definition order.
    Loaded(Vec<LoadedLayer>),
    /// The pass failed as a whole; no layer result is usable.
    Failed(String),
}

/// Counts over one load pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub layers: usize,
    pub layers_failed: usize,
    pub shapes_loaded: usize,
    pub shapes_failed: usize,
    pub features: usize,
}

impl LoadSummary {
    pub fn of(layers: &[LoadedLayer]) -> Self {
        let mut out = LoadSummary {
            layers: layers.len(),
            ..Self::default()
        };
        for layer in layers {
            if layer.error.is_some() {
                out.layers_failed += 1;
            }
            for shape in &layer.shapes {
                match shape.geojson() {
                    Some(fc) => {
                        out.shapes_loaded += 1;
                        out.features += fc.len();
                    }
                    None => out.shapes_failed += 1,
                }
            }
        }
        out
    }
}

/// Loads every shape of every era concurrently.
///
/// Failures stay at the smallest level that can hold them: a shape that
/// cannot be fetched or decoded carries its own error, a layer whose
/// resolution panics becomes a failed layer, and only a failure of the whole
/// fan-out yields [`LoadOutcome::Failed`].
pub async fn load_layers(fetcher: &dyn ArchiveFetcher, defs: &[EraDefinition]) -> LoadOutcome {
    let shape_count: usize = defs.iter().map(|d| d.shapes.len()).sum();
    info!("loading {} eras ({shape_count} shapes)", defs.len());

    match AssertUnwindSafe(fan_out(fetcher, defs)).catch_unwind().await {
        Ok(layers) => {
            let s = LoadSummary::of(&layers);
            info!(
                "load finished: {}/{} shapes, {} features, {} failed layers",
                s.shapes_loaded,
                s.shapes_loaded + s.shapes_failed,
                s.features,
                s.layers_failed
            );
            LoadOutcome::Loaded(layers)
        }
        Err(panic) => {
            let msg = panic_message(panic);
            error!("load pass failed: {msg}");
            LoadOutcome::Failed(msg)
        }
    }
}

async fn fan_out(fetcher: &dyn ArchiveFetcher, defs: &[EraDefinition]) -> Vec<LoadedLayer> {
    // join_all keeps input order regardless of completion order.
    join_all(defs.iter().map(|def| async move {
        match AssertUnwindSafe(load_layer(fetcher, def)).catch_unwind().await {
            Ok(layer) => layer,
            Err(panic) => {
                let msg = panic_message(panic);
                warn!("era {:?} failed: {msg}", def.era);
                LoadedLayer::failed(def.clone(), msg)
            }
        }
    }))
    .await
}

async fn load_layer(fetcher: &dyn ArchiveFetcher, def: &EraDefinition) -> LoadedLayer {
    let shapes = join_all(def.shapes.iter().map(|spec| load_shape(fetcher, spec))).await;
    LoadedLayer::new(def.clone(), shapes)
}

async fn load_shape(fetcher: &dyn ArchiveFetcher, spec: &ShapeSpec) -> LoadedShape {
    let resource = spec.resource.as_str();
    let bytes = match fetcher.fetch(resource).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!("failed to load {resource}: {err}");
            return LoadedShape::failed(spec.clone(), format!("failed to load {resource}: {err}"));
        }
    };

    match decode_archive(&bytes) {
        Ok(collection) => LoadedShape::loaded(spec.clone(), collection),
        Err(err) => {
            warn!("invalid GeoJSON in {resource}: {err}");
            LoadedShape::failed(spec.clone(), format!("invalid GeoJSON in {resource}: {err}"))
        }
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unexpected internal failure".to_string()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::BTreeMap;
    use std::time::Duration;

    use super::{LoadOutcome, LoadSummary, load_layers};
    use crate::fetch::{ArchiveFetcher, BoxFuture, FetchError};
    use formats::{EraDefinition, ShapeKind, ShapeSpec};
    use pretty_assertions::assert_eq;

    pub(crate) enum Script {
        Ok(Vec<u8>),
        Status(u16),
        Panic,
    }

    /// In-memory fetcher answering each resource after a scripted delay.
    #[derive(Default)]
    pub(crate) struct ScriptedFetcher {
        pub(crate) entries: BTreeMap<String, (u64, Script)>,
    }

    impl ScriptedFetcher {
        pub(crate) fn with(mut self, resource: &str, delay_ms: u64, script: Script) -> Self {
            self.entries.insert(resource.to_string(), (delay_ms, script));
            self
        }
    }

    impl ArchiveFetcher for ScriptedFetcher {
        fn fetch<'a>(&'a self, resource: &'a str) -> BoxFuture<'a, Result<Vec<u8>, FetchError>> {
            Box::pin(async move {
                let Some((delay, script)) = self.entries.get(resource) else {
                    return Err(FetchError::Status(404));
                };
                tokio::time::sleep(Duration::from_millis(*delay)).await;
                match script {
                    Script::Ok(bytes) => Ok(bytes.clone()),
                    Script::Status(code) => Err(FetchError::Status(*code)),
                    Script::Panic => panic!("fetcher exploded"),
                }
            })
        }
    }

    pub(crate) fn point_geojson(lon: f64, lat: f64) -> Vec<u8> {
        format!(
            r#"{{"type":"FeatureCollection","features":[
                {{"type":"Feature","properties":{{"name":"p"}},"geometry":{{"type":"Point","coordinates":[{lon},{lat}]}}}}]}}"#
        )
        .into_bytes()
    }

    pub(crate) fn era(name: &str, resources: &[&str]) -> EraDefinition {
        EraDefinition::new(
            name,
            None,
            resources
                .iter()
                .map(|r| ShapeSpec::new(ShapeKind::Points, *r, "Points"))
                .collect(),
        )
    }

    fn loaded(outcome: LoadOutcome) -> Vec<layers::LoadedLayer> {
        match outcome {
            LoadOutcome::Loaded(layers) => layers,
            LoadOutcome::Failed(msg) => panic!("pass failed: {msg}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn output_order_ignores_completion_order() {
        let fetcher = ScriptedFetcher::default()
            .with("a1", 300, Script::Ok(point_geojson(30.0, 61.0)))
            .with("a2", 10, Script::Ok(point_geojson(31.0, 62.0)))
            .with("b1", 200, Script::Ok(point_geojson(29.0, 60.0)))
            .with("c1", 1, Script::Ok(point_geojson(28.0, 59.0)));
        let defs = vec![era("A", &["a1", "a2"]), era("B", &["b1"]), era("C", &["c1"])];

        let layers = loaded(load_layers(&fetcher, &defs).await);
        let eras: Vec<&str> = layers.iter().map(|l| l.era()).collect();
        assert_eq!(eras, vec!["A", "B", "C"]);
        let resources: Vec<&str> = layers[0].shapes.iter().map(|s| s.spec.resource.as_str()).collect();
        assert_eq!(resources, vec!["a1", "a2"]);
        assert_eq!(
            layers[0].bounds().expect("bounds").to_array(),
            [[61.0, 30.0], [62.0, 31.0]]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn shape_failures_stay_local() {
        let fetcher = ScriptedFetcher::default()
            .with("ok", 5, Script::Ok(point_geojson(30.0, 61.0)))
            .with("gone", 1, Script::Status(404))
            .with("junk", 1, Script::Ok(b"not json at all".to_vec()));
        let defs = vec![era("A", &["ok", "gone", "junk"])];

        let layers = loaded(load_layers(&fetcher, &defs).await);
        let shapes = &layers[0].shapes;
        assert!(layers[0].error.is_none());
        assert!(shapes[0].geojson().is_some());
        assert_eq!(shapes[1].error(), Some("failed to load gone: HTTP status 404"));
        assert!(shapes[1].geojson().is_none());
        assert!(shapes[2].error().expect("error").starts_with("invalid GeoJSON in junk"));
        assert_eq!(
            LoadSummary::of(&layers),
            LoadSummary {
                layers: 1,
                layers_failed: 0,
                shapes_loaded: 1,
                shapes_failed: 2,
                features: 1,
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_layer_fails_alone() {
        let fetcher = ScriptedFetcher::default()
            .with("ok", 1, Script::Ok(point_geojson(30.0, 61.0)))
            .with("boom", 1, Script::Panic);
        let defs = vec![era("A", &["ok"]), era("B", &["ok", "boom"])];

        let layers = loaded(load_layers(&fetcher, &defs).await);
        assert!(layers[0].error.is_none());
        assert_eq!(layers[1].error.as_deref(), Some("fetcher exploded"));
        assert!(layers[1].shapes.is_empty());
    }

    #[tokio::test]
    async fn empty_definitions_load_empty() {
        let layers = loaded(load_layers(&ScriptedFetcher::default(), &[]).await);
        assert!(layers.is_empty());
    }
}
