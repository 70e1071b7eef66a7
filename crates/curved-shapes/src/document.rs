//! Host document: named objects, feature workers and recompute.
//!
//! A feature object owns two independent strategies: a [`FeatureWorker`]
//! that rebuilds its shape from other objects, and a [`ViewProvider`] that
//! decides how it appears in the object tree. Both are injected when the
//! object is added.

use std::fmt;

use curved_kernel::curved_kernel_topo::Shape;
use curved_kernel::GeometryKernel;
use slotmap::{new_key_type, SlotMap};
use tracing::{debug, warn};

use crate::array::{validate_options, ArrayOptions, CurvedArrayViewProvider, CurvedArrayWorker};
use crate::segment::{
    CurvedSegmentParams, CurvedSegmentViewProvider, CurvedSegmentWorker, SegmentOptions,
};
use crate::{CurvedError, Diagnostics, Result, Settings};

new_key_type! {
    /// Handle of an object in a [`Document`].
    pub struct ObjectId;
}

/// Result of executing a feature worker.
#[derive(Debug, Clone)]
pub struct FeatureOutput {
    /// The feature's shape.
    pub shape: Shape,
    /// Individual ribs, when the feature was asked to extract them.
    pub ribs: Vec<Shape>,
    /// Problems recovered from while building.
    pub diagnostics: Diagnostics,
}

/// Read access to the document while a worker executes.
pub struct RecomputeContext<'a> {
    /// Geometry kernel of the document.
    pub kernel: &'a dyn GeometryKernel,
    /// Document settings.
    pub settings: &'a Settings,
    objects: &'a SlotMap<ObjectId, DocumentObject>,
}

impl RecomputeContext<'_> {
    /// Current shape of object `id`.
    ///
    /// # Errors
    /// [`CurvedError::Configuration`] if the object does not exist or has no
    /// shape yet.
    pub fn shape(&self, id: ObjectId) -> Result<&Shape> {
        let obj = self
            .objects
            .get(id)
            .ok_or_else(|| CurvedError::config("input object was removed"))?;
        obj.shape
            .as_ref()
            .ok_or_else(|| CurvedError::config(format!("input object {} has no shape", obj.name)))
    }
}

/// Strategy that rebuilds a feature's shape.
pub trait FeatureWorker: fmt::Debug + Send + Sync {
    /// Type name, also the default object name.
    fn type_name(&self) -> &'static str;

    /// Objects the feature reads.
    fn inputs(&self) -> Vec<ObjectId>;

    /// Build the feature.
    fn execute(&self, ctx: &RecomputeContext<'_>) -> Result<FeatureOutput>;
}

/// Strategy deciding how a feature is shown.
pub trait ViewProvider: fmt::Debug + Send + Sync {
    /// Icon resource name.
    fn icon(&self) -> &'static str;

    /// Inputs shown as children of the feature in the tree. Claimed objects
    /// are hidden after recompute.
    ///
    /// Default claims every input.
    fn claim_children(&self, inputs: &[ObjectId]) -> Vec<ObjectId> {
        inputs.to_vec()
    }
}

/// Recompute state of an object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectStatus {
    /// Up to date.
    Valid,
    /// Created or changed, not yet recomputed.
    Touched,
    /// The last recompute failed.
    Failed(String),
}

/// One object of a document.
#[derive(Debug)]
pub struct DocumentObject {
    /// Unique name.
    pub name: String,
    /// Current shape, if any.
    pub shape: Option<Shape>,
    /// Shown in the 3D view.
    pub visible: bool,
    /// Recompute state.
    pub status: ObjectStatus,
    /// Diagnostics of the last recompute.
    pub diagnostics: Diagnostics,
    worker: Option<Box<dyn FeatureWorker>>,
    view: Option<Box<dyn ViewProvider>>,
    extracted: Vec<ObjectId>,
}

impl DocumentObject {
    fn new(name: String) -> Self {
        Self {
            name,
            shape: None,
            visible: true,
            status: ObjectStatus::Touched,
            diagnostics: Diagnostics::new(),
            worker: None,
            view: None,
            extracted: Vec::new(),
        }
    }

    /// Type name of the attached worker, `None` for a plain shape.
    pub fn type_name(&self) -> Option<&'static str> {
        self.worker.as_ref().map(|w| w.type_name())
    }

    /// Icon of the attached view provider.
    pub fn icon(&self) -> Option<&'static str> {
        self.view.as_ref().map(|v| v.icon())
    }

    /// Objects created from this feature's extracted ribs.
    pub fn extracted(&self) -> &[ObjectId] {
        &self.extracted
    }
}

/// A set of objects recomputed against one geometry kernel.
pub struct Document {
    objects: SlotMap<ObjectId, DocumentObject>,
    order: Vec<ObjectId>,
    kernel: Box<dyn GeometryKernel>,
    settings: Settings,
}

impl Default for Document {
    fn default() -> Self {
        Self::with_settings(Settings::default())
    }
}

impl Document {
    /// Empty document using `kernel`.
    pub fn new(kernel: Box<dyn GeometryKernel>, settings: Settings) -> Self {
        Self {
            objects: SlotMap::with_key(),
            order: Vec::new(),
            kernel,
            settings,
        }
    }

    /// Empty document using the native kernel configured from `settings`.
    pub fn with_settings(settings: Settings) -> Self {
        Self::new(Box::new(settings.native_kernel()), settings)
    }

    /// Document settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Number of objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// True if the document has no objects.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Object `id`, if it exists.
    pub fn get(&self, id: ObjectId) -> Option<&DocumentObject> {
        self.objects.get(id)
    }

    /// First object named `name`.
    pub fn object_by_name(&self, name: &str) -> Option<ObjectId> {
        self.order
            .iter()
            .copied()
            .find(|id| self.objects[*id].name == name)
    }

    /// Object ids in insertion order.
    pub fn ids(&self) -> &[ObjectId] {
        &self.order
    }

    /// `base` if no object has that name, else `base` followed by the first
    /// free three-digit suffix.
    pub fn unique_name(&self, base: &str) -> String {
        let taken = |n: &str| self.objects.values().any(|o| o.name == n);
        if !taken(base) {
            return base.to_string();
        }
        (1..)
            .map(|i| format!("{base}{i:03}"))
            .find(|n| !taken(n))
            .unwrap_or_else(|| base.to_string())
    }

    /// Add a plain shape object.
    pub fn add_shape(&mut self, name: &str, shape: Shape) -> ObjectId {
        let mut obj = DocumentObject::new(self.unique_name(name));
        obj.shape = Some(shape);
        obj.status = ObjectStatus::Valid;
        self.insert(obj)
    }

    /// Replace the shape of a plain object.
    ///
    /// # Errors
    /// [`CurvedError::Configuration`] if the object does not exist or is a
    /// feature.
    pub fn set_shape(&mut self, id: ObjectId, shape: Shape) -> Result<()> {
        let obj = self
            .objects
            .get_mut(id)
            .ok_or_else(|| CurvedError::config("no such object"))?;
        if obj.worker.is_some() {
            return Err(CurvedError::config(format!(
                "{} is a feature; its shape is computed",
                obj.name
            )));
        }
        obj.shape = Some(shape);
        Ok(())
    }

    /// Add a feature object with its worker and view strategies. The shape
    /// is built on the next [`recompute`](Self::recompute).
    pub fn add_feature(
        &mut self,
        name: &str,
        worker: Box<dyn FeatureWorker>,
        view: Box<dyn ViewProvider>,
    ) -> ObjectId {
        let mut obj = DocumentObject::new(self.unique_name(name));
        obj.worker = Some(worker);
        obj.view = Some(view);
        self.insert(obj)
    }

    /// Remove an object together with the ribs it extracted.
    pub fn remove(&mut self, id: ObjectId) -> Option<DocumentObject> {
        let obj = self.objects.remove(id)?;
        for rib in &obj.extracted {
            self.objects.remove(*rib);
        }
        self.order.retain(|o| self.objects.contains_key(*o));
        Some(obj)
    }

    fn insert(&mut self, obj: DocumentObject) -> ObjectId {
        let id = self.objects.insert(obj);
        self.order.push(id);
        id
    }

    /// Execute every feature worker in insertion order.
    ///
    /// Each feature's shape and diagnostics are stored, the inputs its view
    /// provider claims are hidden, and its extracted ribs replace the rib
    /// objects of the previous recompute. A failing feature keeps its
    /// previous shape and is marked [`ObjectStatus::Failed`].
    ///
    /// Returns the ids of the features that failed.
    pub fn recompute(&mut self) -> Vec<ObjectId> {
        let mut failed = Vec::new();
        let order = self.order.clone();

        for id in order {
            let Some(obj) = self.objects.get(id) else {
                continue;
            };
            let (Some(worker), Some(view)) = (&obj.worker, &obj.view) else {
                continue;
            };
            let ctx = RecomputeContext {
                kernel: self.kernel.as_ref(),
                settings: &self.settings,
                objects: &self.objects,
            };
            let result = worker.execute(&ctx);
            let claimed = view.claim_children(&worker.inputs());

            match result {
                Ok(output) => {
                    debug!(object = %obj.name, "recomputed");
                    for child in claimed {
                        if let Some(c) = self.objects.get_mut(child) {
                            c.visible = false;
                        }
                    }
                    self.replace_extracted(id, output.ribs);
                    if let Some(obj) = self.objects.get_mut(id) {
                        obj.shape = Some(output.shape);
                        obj.diagnostics = output.diagnostics;
                        obj.status = ObjectStatus::Valid;
                    }
                }
                Err(err) => {
                    warn!(object = %obj.name, "recompute failed: {err}");
                    if let Some(obj) = self.objects.get_mut(id) {
                        obj.status = ObjectStatus::Failed(err.to_string());
                        obj.diagnostics = Diagnostics::new();
                    }
                    failed.push(id);
                }
            }
        }
        failed
    }

    fn replace_extracted(&mut self, id: ObjectId, ribs: Vec<Shape>) {
        let Some(obj) = self.objects.get_mut(id) else {
            return;
        };
        let old = std::mem::take(&mut obj.extracted);
        let base = format!("{}_Rib", obj.name);
        for rib in old {
            self.objects.remove(rib);
        }
        self.order.retain(|o| self.objects.contains_key(*o));

        let new: Vec<ObjectId> = ribs
            .into_iter()
            .map(|shape| self.add_shape(&base, shape))
            .collect();
        if let Some(obj) = self.objects.get_mut(id) {
            obj.extracted = new;
        }
    }

    fn check_inputs(&self, ids: &[ObjectId]) -> Result<()> {
        for id in ids {
            match self.objects.get(*id) {
                None => return Err(CurvedError::config("input object does not exist")),
                Some(obj) if obj.shape.is_none() && obj.worker.is_none() => {
                    return Err(CurvedError::config(format!("{} has no shape", obj.name)))
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Create a curved array feature, recompute, and return its handle.
    ///
    /// # Errors
    /// [`CurvedError::Configuration`] if an input object is missing, no hull
    /// curve is given, or the options are invalid. Nothing is added then.
    /// Geometric failures are reported on the object's status instead.
    pub fn make_curved_array(
        &mut self,
        base: ObjectId,
        hullcurves: Vec<ObjectId>,
        options: ArrayOptions,
    ) -> Result<ObjectId> {
        if hullcurves.is_empty() {
            return Err(CurvedError::config("curved array needs at least one hull curve"));
        }
        self.check_inputs(&[base])?;
        self.check_inputs(&hullcurves)?;
        validate_options(&options, &self.settings)?;

        let worker = CurvedArrayWorker {
            base,
            hullcurves,
            options,
        };
        let id = self.add_feature(
            worker.type_name(),
            Box::new(worker),
            Box::new(CurvedArrayViewProvider),
        );
        self.recompute();
        Ok(id)
    }

    /// Create a curved segment feature, recompute, and return its handle.
    ///
    /// # Errors
    /// [`CurvedError::Configuration`] if an input object is missing, a
    /// normal is zero, or the endpoint shapes have different edge counts.
    /// Nothing is added then. Endpoints that are features without a shape
    /// yet are checked on recompute.
    pub fn make_curved_segment(
        &mut self,
        shape1: ObjectId,
        shape2: ObjectId,
        hullcurves: Vec<ObjectId>,
        options: SegmentOptions,
    ) -> Result<ObjectId> {
        self.check_inputs(&[shape1, shape2])?;
        self.check_inputs(&hullcurves)?;
        for n in [options.normal_shape1, options.normal_shape2] {
            if n.iter().map(|c| c * c).sum::<f64>().sqrt() <= self.settings.epsilon {
                return Err(CurvedError::config("curved segment normal is zero"));
            }
        }
        let current = |id: ObjectId| self.objects.get(id).and_then(|o| o.shape.clone());
        if let (Some(s1), Some(s2)) = (current(shape1), current(shape2)) {
            CurvedSegmentParams {
                shape1: Some(s1),
                shape2: Some(s2),
                hullcurves: Vec::new(),
                options: options.clone(),
            }
            .validate(&self.settings)?;
        }

        let worker = CurvedSegmentWorker {
            shape1,
            shape2,
            hullcurves,
            options,
        };
        let id = self.add_feature(
            worker.type_name(),
            Box::new(worker),
            Box::new(CurvedSegmentViewProvider),
        );
        self.recompute();
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::init_tracing;
    use curved_kernel::curved_kernel_math::Point3;
    use curved_kernel::curved_kernel_topo::{make_wire, Edge, ShapeType};

    fn square(z: f64) -> Shape {
        let p = |x: f64, y: f64| Point3::new(x, y, z);
        Shape::wire(make_wire(vec![
            Edge::line(p(0.0, 0.0), p(2.0, 0.0)),
            Edge::line(p(2.0, 0.0), p(2.0, 2.0)),
            Edge::line(p(2.0, 2.0), p(0.0, 2.0)),
            Edge::line(p(0.0, 2.0), p(0.0, 0.0)),
        ]))
    }

    fn post(x: f64, top: f64) -> Shape {
        Shape::edge(Edge::line(Point3::new(x, x, 0.0), Point3::new(x, x, top)))
    }

    #[test]
    fn test_unique_names() {
        let mut doc = Document::default();
        let a = doc.add_shape("Rib", square(0.0));
        let b = doc.add_shape("Rib", square(1.0));
        let c = doc.add_shape("Rib", square(2.0));
        assert_eq!(doc.get(a).unwrap().name, "Rib");
        assert_eq!(doc.get(b).unwrap().name, "Rib001");
        assert_eq!(doc.get(c).unwrap().name, "Rib002");
        assert_eq!(doc.object_by_name("Rib001"), Some(b));
        assert_eq!(doc.ids(), &[a, b, c]);
    }

    #[test]
    fn test_make_curved_array() {
        init_tracing();
        let mut doc = Document::default();
        let base = doc.add_shape("Base", square(0.0));
        let h1 = doc.add_shape("Hull", post(0.0, 10.0));
        let h2 = doc.add_shape("Hull", post(2.0, 10.0));

        let options = ArrayOptions {
            items: 3,
            ..Default::default()
        };
        let id = doc.make_curved_array(base, vec![h1, h2], options).unwrap();

        let obj = doc.get(id).unwrap();
        assert_eq!(obj.name, "CurvedArray");
        assert_eq!(obj.type_name(), Some("CurvedArray"));
        assert_eq!(obj.icon(), Some("curvedArray.svg"));
        assert_eq!(obj.status, ObjectStatus::Valid);
        assert_eq!(obj.shape.as_ref().unwrap().shape_type(), ShapeType::Compound);

        for input in [base, h1, h2] {
            assert!(!doc.get(input).unwrap().visible);
        }

        let second = doc
            .make_curved_array(base, vec![h1, h2], ArrayOptions::default())
            .unwrap();
        assert_eq!(doc.get(second).unwrap().name, "CurvedArray001");
    }

    #[test]
    fn test_extracted_ribs_replaced_on_recompute() {
        let mut doc = Document::default();
        let base = doc.add_shape("Base", square(0.0));
        let h1 = doc.add_shape("Hull", post(0.0, 10.0));
        let h2 = doc.add_shape("Hull", post(2.0, 10.0));
        let options = ArrayOptions {
            items: 4,
            extract: true,
            ..Default::default()
        };
        let id = doc.make_curved_array(base, vec![h1, h2], options).unwrap();
        assert_eq!(doc.get(id).unwrap().extracted().len(), 4);
        assert_eq!(doc.len(), 8);

        assert!(doc.recompute().is_empty());
        let ribs = doc.get(id).unwrap().extracted().to_vec();
        assert_eq!(ribs.len(), 4);
        assert_eq!(doc.len(), 8);
        let top = doc.get(ribs[3]).unwrap();
        assert!(top.name.starts_with("CurvedArray_Rib"));
        assert!((top.shape.as_ref().unwrap().bounding_box().min.z - 10.0).abs() < 1e-9);

        doc.remove(id);
        assert_eq!(doc.len(), 3);
    }

    #[test]
    fn test_make_curved_segment_and_failure() {
        let mut doc = Document::default();
        let s1 = doc.add_shape("Start", square(0.0));
        let s2 = doc.add_shape("End", square(10.0));
        let id = doc
            .make_curved_segment(s1, s2, Vec::new(), SegmentOptions::default())
            .unwrap();
        let obj = doc.get(id).unwrap();
        assert_eq!(obj.name, "CurvedSegment");
        assert_eq!(obj.icon(), Some("curvedSegment.svg"));
        assert_eq!(obj.status, ObjectStatus::Valid);

        // A hull curve that misses every intermediate plane.
        let stub = doc.add_shape("Hull", post(0.0, 1.0));
        let bad = doc
            .make_curved_segment(s1, s2, vec![stub], SegmentOptions::default())
            .unwrap();
        assert!(matches!(doc.get(bad).unwrap().status, ObjectStatus::Failed(_)));
        assert_eq!(doc.recompute(), vec![bad]);
        // The first segment is unaffected.
        assert_eq!(doc.get(id).unwrap().status, ObjectStatus::Valid);
    }

    #[test]
    fn test_set_shape_updates_feature() {
        let mut doc = Document::default();
        let s1 = doc.add_shape("Start", square(0.0));
        let s2 = doc.add_shape("End", square(10.0));
        let options = SegmentOptions {
            items: 1,
            ..Default::default()
        };
        let id = doc.make_curved_segment(s1, s2, Vec::new(), options).unwrap();

        doc.set_shape(s2, square(20.0)).unwrap();
        doc.recompute();
        let bb = doc.get(id).unwrap().shape.as_ref().unwrap().bounding_box();
        assert!((bb.min.z - 10.0).abs() < 1e-9);

        assert!(matches!(
            doc.set_shape(id, square(0.0)),
            Err(CurvedError::Configuration(_))
        ));
    }

    #[test]
    fn test_invalid_inputs_add_nothing() {
        let mut doc = Document::default();
        let base = doc.add_shape("Base", square(0.0));
        let gone = doc.add_shape("Hull", post(0.0, 10.0));
        doc.remove(gone);

        assert!(matches!(
            doc.make_curved_array(base, vec![gone], ArrayOptions::default()),
            Err(CurvedError::Configuration(_))
        ));
        assert!(matches!(
            doc.make_curved_array(base, Vec::new(), ArrayOptions::default()),
            Err(CurvedError::Configuration(_))
        ));
        let zero_items = ArrayOptions {
            items: 0,
            ..Default::default()
        };
        let hull = doc.add_shape("Hull", post(0.0, 10.0));
        assert!(matches!(
            doc.make_curved_array(base, vec![hull], zero_items),
            Err(CurvedError::Configuration(_))
        ));
        assert_eq!(doc.len(), 2);
    }

    #[test]
    fn test_segment_edge_count_mismatch_is_returned() {
        let mut doc = Document::default();
        let p = |x: f64, y: f64| Point3::new(x, y, 10.0);
        let triangle = Shape::wire(make_wire(vec![
            Edge::line(p(0.0, 0.0), p(2.0, 0.0)),
            Edge::line(p(2.0, 0.0), p(0.0, 2.0)),
            Edge::line(p(0.0, 2.0), p(0.0, 0.0)),
        ]));
        let s1 = doc.add_shape("Start", square(0.0));
        let s2 = doc.add_shape("End", triangle);

        let err = doc
            .make_curved_segment(s1, s2, Vec::new(), SegmentOptions::default())
            .unwrap_err();
        assert!(matches!(err, CurvedError::Configuration(_)));
        assert!(err.to_string().contains("4 and 3 edges"));
        assert_eq!(doc.len(), 2);
    }
}
