use serde::Serialize;
use thiserror::Error;

use crate::palette::Rgb;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FillStyle {
    pub opacity: f64,
    pub color: Rgb,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LineStyle {
    pub width: u32,
    pub opacity: f64,
    pub color: Rgb,
}

/// Area marker as held by the map service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AreaMarker {
    pub id: String,
    pub label: String,
    pub markup: bool,
    pub world_name: String,
    pub x: [f64; 2],
    pub z: [f64; 2],
    pub y: Option<[f64; 2]>,
    pub fill: Option<FillStyle>,
    pub line: Option<LineStyle>,
}

impl AreaMarker {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        markup: bool,
        world_name: impl Into<String>,
        x: [f64; 2],
        z: [f64; 2],
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            markup,
            world_name: world_name.into(),
            x,
            z,
            y: None,
            fill: None,
            line: None,
        }
    }

    pub fn apply(&mut self, update: &MarkerUpdate) {
        match update {
            MarkerUpdate::Corners { x, z } => {
                self.x = *x;
                self.z = *z;
            }
            MarkerUpdate::RangeY { y } => self.y = Some(*y),
            MarkerUpdate::Label { label, markup } => {
                self.label.clone_from(label);
                self.markup = *markup;
            }
            MarkerUpdate::Fill(style) => self.fill = Some(*style),
            MarkerUpdate::Line(style) => self.line = Some(*style),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MarkerUpdate {
    Corners { x: [f64; 2], z: [f64; 2] },
    RangeY { y: [f64; 2] },
    Label { label: String, markup: bool },
    Fill(FillStyle),
    Line(LineStyle),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("marker set '{set_id}' does not exist")]
    MarkerSetMissing { set_id: String },
    #[error("marker '{marker_id}' already exists in set '{set_id}'")]
    MarkerExists { set_id: String, marker_id: String },
    #[error("marker '{marker_id}' does not exist in set '{set_id}'")]
    MarkerMissing { set_id: String, marker_id: String },
    #[error("marker service unavailable: {message}")]
    Unavailable { message: String },
}

/// Remote marker service. Calls block until the service answers.
pub trait MarkerService {
    fn has_marker_set(&self, set_id: &str) -> bool;
    fn create_marker_set(&mut self, set_id: &str, label: &str) -> Result<(), StoreError>;
    fn find_area_marker(&self, set_id: &str, marker_id: &str) -> Option<AreaMarker>;
    fn create_area_marker(
        &mut self,
        set_id: &str,
        marker: AreaMarker,
    ) -> Result<AreaMarker, StoreError>;
    fn update_area_marker(
        &mut self,
        set_id: &str,
        marker_id: &str,
        update: MarkerUpdate,
    ) -> Result<(), StoreError>;
    fn delete_area_marker(&mut self, set_id: &str, marker_id: &str) -> Result<(), StoreError>;
}

impl<T: MarkerService + ?Sized> MarkerService for &mut T {
    fn has_marker_set(&self, set_id: &str) -> bool {
        (**self).has_marker_set(set_id)
    }

    fn create_marker_set(&mut self, set_id: &str, label: &str) -> Result<(), StoreError> {
        (**self).create_marker_set(set_id, label)
    }

    fn find_area_marker(&self, set_id: &str, marker_id: &str) -> Option<AreaMarker> {
        (**self).find_area_marker(set_id, marker_id)
    }

    fn create_area_marker(
        &mut self,
        set_id: &str,
        marker: AreaMarker,
    ) -> Result<AreaMarker, StoreError> {
        (**self).create_area_marker(set_id, marker)
    }

    fn update_area_marker(
        &mut self,
        set_id: &str,
        marker_id: &str,
        update: MarkerUpdate,
    ) -> Result<(), StoreError> {
        (**self).update_area_marker(set_id, marker_id, update)
    }

    fn delete_area_marker(&mut self, set_id: &str, marker_id: &str) -> Result<(), StoreError> {
        (**self).delete_area_marker(set_id, marker_id)
    }
}

/// A [`MarkerService`] scoped to one marker set. Mutators keep the caller's
/// marker handle in step with what was sent to the service.
#[derive(Debug)]
pub struct MarkerStoreAdapter<S> {
    service: S,
    set_id: String,
}

impl<S: MarkerService> MarkerStoreAdapter<S> {
    /// Opens `set_id`, creating it with `label` if the service lacks it.
    pub fn open(mut service: S, set_id: &str, label: &str) -> Result<Self, StoreError> {
        if !service.has_marker_set(set_id) {
            service.create_marker_set(set_id, label)?;
        }
        Ok(Self {
            service,
            set_id: set_id.to_string(),
        })
    }

    pub fn set_id(&self) -> &str {
        &self.set_id
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn service_mut(&mut self) -> &mut S {
        &mut self.service
    }

    pub fn into_service(self) -> S {
        self.service
    }

    pub fn find(&self, marker_id: &str) -> Option<AreaMarker> {
        self.service.find_area_marker(&self.set_id, marker_id)
    }

    /// Callers must check [`Self::find`] first; creating an id twice is a bug.
    pub fn create(
        &mut self,
        marker_id: &str,
        label: &str,
        world_name: &str,
        x: [f64; 2],
        z: [f64; 2],
        markup: bool,
    ) -> Result<AreaMarker, StoreError> {
        let marker = AreaMarker::new(marker_id, label, markup, world_name, x, z);
        self.service.create_area_marker(&self.set_id, marker)
    }

    pub fn set_corners(
        &mut self,
        marker: &mut AreaMarker,
        x: [f64; 2],
        z: [f64; 2],
    ) -> Result<(), StoreError> {
        self.update(marker, MarkerUpdate::Corners { x, z })
    }

    pub fn set_range_y(&mut self, marker: &mut AreaMarker, y: [f64; 2]) -> Result<(), StoreError> {
        self.update(marker, MarkerUpdate::RangeY { y })
    }

    pub fn set_label(
        &mut self,
        marker: &mut AreaMarker,
        label: &str,
        markup: bool,
    ) -> Result<(), StoreError> {
        self.update(
            marker,
            MarkerUpdate::Label {
                label: label.to_string(),
                markup,
            },
        )
    }

    pub fn set_fill_style(
        &mut self,
        marker: &mut AreaMarker,
        opacity: f64,
        color: Rgb,
    ) -> Result<(), StoreError> {
        self.update(marker, MarkerUpdate::Fill(FillStyle { opacity, color }))
    }

    pub fn set_line_style(
        &mut self,
        marker: &mut AreaMarker,
        width: u32,
        opacity: f64,
        color: Rgb,
    ) -> Result<(), StoreError> {
        self.update(
            marker,
            MarkerUpdate::Line(LineStyle {
                width,
                opacity,
                color,
            }),
        )
    }

    pub fn delete(&mut self, marker: AreaMarker) -> Result<(), StoreError> {
        self.service.delete_area_marker(&self.set_id, &marker.id)
    }

    fn update(&mut self, marker: &mut AreaMarker, update: MarkerUpdate) -> Result<(), StoreError> {
        self.service
            .update_area_marker(&self.set_id, &marker.id, update.clone())?;
        marker.apply(&update);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InMemoryMarkerService, MutationKind};

    #[test]
    fn open_creates_missing_set_once() {
        let mut service = InMemoryMarkerService::new();
        {
            let adapter = MarkerStoreAdapter::open(&mut service, "claims", "Claims").expect("open");
            assert_eq!(adapter.set_id(), "claims");
        }
        let _ = MarkerStoreAdapter::open(&mut service, "claims", "Claims").expect("reopen");

        assert_eq!(service.count(MutationKind::CreateSet), 1);
        assert_eq!(service.marker_set_label("claims"), Some("Claims"));
    }

    #[test]
    fn find_returns_none_for_absent_marker() {
        let adapter =
            MarkerStoreAdapter::open(InMemoryMarkerService::new(), "claims", "Claims").expect("open");
        assert!(adapter.find("nope").is_none());
    }

    #[test]
    fn mutators_keep_handle_and_service_in_step() {
        let mut adapter =
            MarkerStoreAdapter::open(InMemoryMarkerService::new(), "claims", "Claims").expect("open");
        let mut marker = adapter
            .create("m1", "first", "world", [0.0, 4.0], [1.0, 5.0], true)
            .expect("create");

        adapter
            .set_corners(&mut marker, [-2.0, 2.0], [-3.0, 3.0])
            .expect("corners");
        adapter.set_label(&mut marker, "second", true).expect("label");
        adapter
            .set_fill_style(&mut marker, 0.25, Rgb(0xcfd5d6))
            .expect("fill");
        adapter
            .set_line_style(&mut marker, 2, 1.0, Rgb(0xcfd5d6))
            .expect("line");

        let stored = adapter.find("m1").expect("stored");
        assert_eq!(stored, marker);
        assert_eq!(stored.x, [-2.0, 2.0]);
        assert_eq!(stored.label, "second");
        assert_eq!(
            stored.line,
            Some(LineStyle {
                width: 2,
                opacity: 1.0,
                color: Rgb(0xcfd5d6)
            })
        );

        adapter.delete(marker).expect("delete");
        assert!(adapter.find("m1").is_none());
    }

    #[test]
    fn duplicate_create_is_rejected_by_service() {
        let mut adapter =
            MarkerStoreAdapter::open(InMemoryMarkerService::new(), "claims", "Claims").expect("open");
        adapter
            .create("m1", "a", "world", [0.0, 1.0], [0.0, 1.0], true)
            .expect("create");
        let error = adapter
            .create("m1", "b", "world", [0.0, 1.0], [0.0, 1.0], true)
            .expect_err("duplicate");
        assert!(matches!(error, StoreError::MarkerExists { .. }));
    }
}
