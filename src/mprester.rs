//! The `MpRester` facade.
//!
//! One [`MpRester`] owns the [`Session`] and one client per resource (see
//! [`ResterRegistry`]). The convenience methods forward to those clients and
//! lightly post-process what they return.

use serde_json::Value;
use std::sync::Arc;

use crate::client::{check_status, QuerySettings, Session};
use crate::config::Config;
use crate::models::{
    ComputedEntry, Document, Fields, GrainBoundaryDoc, MaterialId, SearchRequest, Structure,
    SubstrateDoc, Surface, SurfacePropertiesDoc, WulffInput,
};
use crate::resters::{
    BandStructureRester, ChargeDensityRester, DosRester, GrainBoundaryFilter, GrainBoundaryRester,
    MaterialsRester, PhononRester, Rester, ResterError, ResterRegistry, SubstratesFilter,
    SubstratesRester, SurfacePropertiesRester, TasksRester, ThermoRester, XasRester,
};
use crate::symmetry::SymmetryAnalyzer;
use crate::utils::{Transport, TransportRequest};

pub use crate::resters::FindStructureOptions;

/// Path of the unauthenticated status endpoint
const HEARTBEAT_PATH: &str = "heartbeat";

/// Entry point to every resource of the API.
///
/// The session is released exactly once, by [`MpRester::close`] or when the
/// facade is dropped.
#[derive(Debug)]
pub struct MpRester {
    session: Arc<Session>,
    registry: ResterRegistry,
    symmetry: Option<Arc<dyn SymmetryAnalyzer>>,

    materials: Arc<MaterialsRester>,
    thermo: Arc<ThermoRester>,
    tasks: Arc<TasksRester>,
    charge_density: Arc<ChargeDensityRester>,
    bandstructure: Arc<BandStructureRester>,
    dos: Arc<DosRester>,
    phonon: Arc<PhononRester>,
    substrates: Arc<SubstratesRester>,
    surface_properties: Arc<SurfacePropertiesRester>,
    grain_boundary: Arc<GrainBoundaryRester>,
    xas: Arc<XasRester>,
}

impl MpRester {
    /// Connect over HTTP using `config`
    pub fn new(config: &Config) -> Result<Self, ResterError> {
        let session = Session::http(&config.to_http_settings())?;
        tracing::info!(endpoint = %config.api.endpoint, "created Materials Project client");
        Self::with_session(Arc::new(session), config.to_query_settings())
    }

    /// Build the facade over an existing transport
    pub fn with_transport(
        transport: Arc<dyn Transport>,
        api_key: Option<String>,
        settings: QuerySettings,
    ) -> Result<Self, ResterError> {
        Self::with_session(Arc::new(Session::new(transport, api_key)), settings)
    }

    fn with_session(session: Arc<Session>, settings: QuerySettings) -> Result<Self, ResterError> {
        let registry = ResterRegistry::builtin(session.clone(), settings)?;

        Ok(Self {
            materials: registry.typed_required()?,
            thermo: registry.typed_required()?,
            tasks: registry.typed_required()?,
            charge_density: registry.typed_required()?,
            bandstructure: registry.typed_required()?,
            dos: registry.typed_required()?,
            phonon: registry.typed_required()?,
            substrates: registry.typed_required()?,
            surface_properties: registry.typed_required()?,
            grain_boundary: registry.typed_required()?,
            xas: registry.typed_required()?,
            session,
            registry,
            symmetry: None,
        })
    }

    /// Use `analyzer` for conventional cells and equivalent surfaces
    pub fn with_symmetry(mut self, analyzer: Arc<dyn SymmetryAnalyzer>) -> Self {
        self.symmetry = Some(analyzer);
        self
    }

    /// Every resource client, keyed by name
    pub fn registry(&self) -> &ResterRegistry {
        &self.registry
    }

    /// A resource client by name, e.g. `electronic_structure_dos`
    pub fn rester(&self, name: &str) -> Result<&Arc<dyn Rester>, ResterError> {
        self.registry.get_required(name)
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn materials(&self) -> &MaterialsRester {
        &self.materials
    }

    pub fn thermo(&self) -> &ThermoRester {
        &self.thermo
    }

    pub fn tasks(&self) -> &TasksRester {
        &self.tasks
    }

    pub fn charge_density(&self) -> &ChargeDensityRester {
        &self.charge_density
    }

    pub fn electronic_structure_bandstructure(&self) -> &BandStructureRester {
        &self.bandstructure
    }

    pub fn electronic_structure_dos(&self) -> &DosRester {
        &self.dos
    }

    pub fn phonon(&self) -> &PhononRester {
        &self.phonon
    }

    pub fn substrates(&self) -> &SubstratesRester {
        &self.substrates
    }

    pub fn surface_properties(&self) -> &SurfacePropertiesRester {
        &self.surface_properties
    }

    pub fn grain_boundary(&self) -> &GrainBoundaryRester {
        &self.grain_boundary
    }

    pub fn xas(&self) -> &XasRester {
        &self.xas
    }

    /// Release the session. Returns `true` if this call released it.
    pub fn close(&self) -> bool {
        self.session.close()
    }

    fn analyzer(&self, operation: &str) -> Result<&dyn SymmetryAnalyzer, ResterError> {
        self.symmetry.as_deref().ok_or_else(|| {
            ResterError::NotImplemented(format!(
                "{} requires a symmetry analyzer (see MpRester::with_symmetry)",
                operation
            ))
        })
    }

    /// Search any resource by name
    pub async fn query(
        &self,
        resource: &str,
        request: &SearchRequest,
    ) -> Result<Vec<Document>, ResterError> {
        self.rester(resource)?.search(request).await
    }

    /// The final structure, or the initial structures when `final_structure`
    /// is false, optionally converted to the conventional standard cell
    pub async fn get_structure_by_material_id(
        &self,
        material_id: &str,
        final_structure: bool,
        conventional_unit_cell: bool,
    ) -> Result<Vec<Structure>, ResterError> {
        let analyzer = if conventional_unit_cell {
            Some(self.analyzer("conventional_unit_cell")?)
        } else {
            None
        };

        let structures = if final_structure {
            vec![self.materials.get_structure_by_material_id(material_id).await?]
        } else {
            self.materials
                .get_initial_structures_by_material_id(material_id)
                .await?
        };

        match analyzer {
            Some(analyzer) => structures
                .iter()
                .map(|s| analyzer.conventional_standard_structure(s))
                .collect(),
            None => Ok(structures),
        }
    }

    /// Database release, e.g. `2021_05_13`
    pub async fn get_database_version(&self) -> Result<String, ResterError> {
        let response = self
            .session
            .send_public(&TransportRequest::get(HEARTBEAT_PATH))
            .await?;
        let body = check_status(HEARTBEAT_PATH, HEARTBEAT_PATH, response)?;

        let version = body
            .get("db_version")
            .or_else(|| body.pointer("/data/0/db_version"))
            .and_then(Value::as_str);

        version.map(str::to_string).ok_or_else(|| {
            ResterError::UnexpectedResponse(format!("heartbeat has no db_version: {}", body))
        })
    }

    /// The material a calculation belongs to. `None` (with a warning) when no
    /// material contains the task.
    pub async fn get_materials_id_from_task_id(
        &self,
        task_id: &str,
    ) -> Result<Option<String>, ResterError> {
        let mut ids = self.materials.material_ids_for_task(task_id).await?;

        match ids.len() {
            0 => {
                tracing::warn!(
                    task_id,
                    "no material found containing task; please report it if you suspect a task has gone missing"
                );
                Ok(None)
            }
            1 => Ok(ids.pop()),
            n => Err(ResterError::UnexpectedResponse(format!(
                "{} materials contain task {}, expected at most one",
                n, task_id
            ))),
        }
    }

    /// Not available from the API
    pub async fn get_materials_id_references(&self, _material_id: &str) -> Result<String, ResterError> {
        Err(ResterError::NotImplemented("get_materials_id_references".to_string()))
    }

    /// Every material id for a chemical system or formula, sorted
    pub async fn get_materials_ids(
        &self,
        chemsys_formula: &str,
    ) -> Result<Vec<MaterialId>, ResterError> {
        let docs = self
            .materials
            .search_material_docs(Some(chemsys_formula), None, Fields::only(["material_id"]))
            .await?;

        let mut ids = docs
            .iter()
            .map(|doc| doc.field::<String>("material_id")?.parse::<MaterialId>().map_err(ResterError::from))
            .collect::<Result<Vec<MaterialId>, ResterError>>()?;
        ids.sort();
        Ok(ids)
    }

    /// Final structures, or every initial structure, for a chemical system or
    /// formula
    pub async fn get_structures(
        &self,
        chemsys_formula: &str,
        final_structure: bool,
    ) -> Result<Vec<Structure>, ResterError> {
        let field = if final_structure {
            "structure"
        } else {
            "initial_structures"
        };
        let docs = self
            .materials
            .search_material_docs(Some(chemsys_formula), None, Fields::only([field]))
            .await?;

        let mut structures = Vec::new();
        for doc in &docs {
            if final_structure {
                structures.push(doc.field::<Structure>(field)?);
            } else {
                structures.extend(doc.field::<Vec<Structure>>(field)?);
            }
        }
        Ok(structures)
    }

    /// Computed entries for a chemical system or formula
    pub async fn get_entries(
        &self,
        chemsys_formula: &str,
        sort_by_e_above_hull: bool,
    ) -> Result<Vec<ComputedEntry>, ResterError> {
        self.thermo.get_entries(chemsys_formula, sort_by_e_above_hull).await
    }

    /// Computed entries of one material
    pub async fn get_entry_by_material_id(
        &self,
        material_id: &str,
    ) -> Result<Vec<ComputedEntry>, ResterError> {
        self.thermo.get_entries_by_material_id(material_id).await
    }

    /// Not available from the API
    pub async fn get_phonon_dos_by_material_id(&self, _material_id: &str) -> Result<Value, ResterError> {
        Err(ResterError::NotImplemented("get_phonon_dos_by_material_id".to_string()))
    }

    pub async fn get_phonon_bandstructure_by_material_id(
        &self,
        material_id: &str,
    ) -> Result<Value, ResterError> {
        self.phonon.get_phonon_bandstructure(material_id).await
    }

    pub async fn get_bandstructure_by_material_id(
        &self,
        material_id: &str,
    ) -> Result<Value, ResterError> {
        self.bandstructure
            .get_bandstructure_from_material_id(material_id)
            .await
    }

    pub async fn get_dos_by_material_id(&self, material_id: &str) -> Result<Value, ResterError> {
        self.dos.get_dos_from_material_id(material_id).await
    }

    /// Material ids matching `structure`, best match first
    pub async fn find_structure(
        &self,
        structure: &Structure,
        options: FindStructureOptions,
    ) -> Result<Vec<String>, ResterError> {
        self.materials.find_structure(structure, options).await
    }

    pub async fn get_charge_density_from_calculation_id(
        &self,
        task_id: &str,
    ) -> Result<Value, ResterError> {
        self.charge_density
            .get_charge_density_from_calculation_id(task_id)
            .await
    }

    /// INCAR, POSCAR and KPOINTS of a charge density calculation
    pub async fn get_charge_density_calculation_details(
        &self,
        task_id: &str,
    ) -> Result<Value, ResterError> {
        self.tasks.get_calculation_inputs(task_id).await
    }

    /// Ids of the static calculations of a material, which are the ones with a
    /// charge density
    pub async fn get_charge_density_calculation_ids_from_material_id(
        &self,
        material_id: &str,
    ) -> Result<Vec<String>, ResterError> {
        let calc_types = self.materials.get_calc_types(material_id).await?;

        Ok(calc_types
            .into_iter()
            .filter(|(_, calc_type)| calc_type.as_str().is_some_and(|t| t.contains("Static")))
            .map(|(id, _)| id)
            .collect())
    }

    /// Not available from the API
    pub async fn submit_structures(
        &self,
        _structures: &[Structure],
        _public_name: &str,
        _public_email: &str,
    ) -> Result<Vec<String>, ResterError> {
        Err(ResterError::NotImplemented("submit_structures".to_string()))
    }

    /// Not available from the API
    pub async fn get_stability(&self, _entries: &[ComputedEntry]) -> Result<Vec<Value>, ResterError> {
        Err(ResterError::NotImplemented("get_stability".to_string()))
    }

    /// Not available from the API
    pub async fn get_cohesive_energy(
        &self,
        _material_id: &str,
        _per_atom: bool,
    ) -> Result<f64, ResterError> {
        Err(ResterError::NotImplemented("get_cohesive_energy".to_string()))
    }

    /// Not available from the API
    pub async fn get_reaction(
        &self,
        _reactants: &[String],
        _products: &[String],
    ) -> Result<Value, ResterError> {
        Err(ResterError::NotImplemented("get_reaction".to_string()))
    }

    /// Not available from the API
    pub async fn get_interface_reactions(
        &self,
        _reactant1: &str,
        _reactant2: &str,
        _open_element: Option<&str>,
        _relative_mu: Option<f64>,
        _use_hull_energy: bool,
    ) -> Result<Vec<Value>, ResterError> {
        Err(ResterError::NotImplemented("get_interface_reactions".to_string()))
    }

    /// Substrates for a film, in order of increasing elastic energy
    pub async fn get_substrates(
        &self,
        material_id: &str,
        orientation: Option<&[i32]>,
    ) -> Result<Vec<SubstrateDoc>, ResterError> {
        let mut filter = SubstratesFilter::film(material_id);
        if let Some(orientation) = orientation {
            filter = filter.substrate_orientation(orientation);
        }
        self.substrates.search_substrates_docs(&filter).await
    }

    /// Surface data of a material with energies in J/m²
    pub async fn get_surface_data(
        &self,
        material_id: &str,
    ) -> Result<SurfacePropertiesDoc, ResterError> {
        self.surface_properties
            .get_surface_properties(material_id)
            .await
    }

    /// The surface whose Miller index is symmetrically equivalent to
    /// `miller_index`, if one was calculated
    pub async fn get_surface_data_for_miller(
        &self,
        material_id: &str,
        miller_index: &[i32],
    ) -> Result<Option<Surface>, ResterError> {
        let analyzer = self.analyzer("get_surface_data_for_miller")?;

        let doc = self.get_surface_data(material_id).await?;
        let structure = self.materials.get_structure_by_material_id(material_id).await?;
        let equivalent = analyzer.equivalent_miller_indices(&structure, miller_index)?;

        Ok(doc
            .surfaces
            .into_iter()
            .find(|surface| {
                surface.miller_index.as_slice() == miller_index
                    || equivalent.contains(&surface.miller_index)
            }))
    }

    /// Input for a Wulff construction: the conventional lattice and one
    /// surface energy per Miller index, reconstructed surfaces preferred
    pub async fn get_wulff_shape(&self, material_id: &str) -> Result<WulffInput, ResterError> {
        let analyzer = self.analyzer("get_wulff_shape")?;

        let structure = self.materials.get_structure_by_material_id(material_id).await?;
        let surfaces = self.get_surface_data(material_id).await?.surfaces;
        let conventional = analyzer.conventional_standard_structure(&structure)?;

        let input = WulffInput::from_surfaces(conventional.lattice, &surfaces);
        if input.facets.is_empty() {
            return Err(ResterError::NotFound {
                resource: self.surface_properties.name().to_string(),
                id: format!("{} (surface energies)", material_id),
            });
        }
        Ok(input)
    }

    /// Grain boundaries matching `filter`. Energies are in J/m².
    pub async fn get_gb_data(
        &self,
        filter: &GrainBoundaryFilter,
    ) -> Result<Vec<GrainBoundaryDoc>, ResterError> {
        self.grain_boundary.search_grain_boundary_docs(filter).await
    }
}

impl Drop for MpRester {
    fn drop(&mut self) {
        self.session.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{json_response, InMemoryResource, MockTransport};
    use crate::symmetry::testing::CubicAnalyzer;
    use serde_json::json;

    fn structure(a: f64) -> Value {
        json!({
            "lattice": {"matrix": [[a, 0.0, 0.0], [0.0, a, 0.0], [0.0, 0.0, a]]},
            "sites": [{"species": [{"element": "Fe", "occu": 1.0}], "abc": [0.0, 0.0, 0.0]}]
        })
    }

    fn backend() -> Vec<InMemoryResource> {
        vec![
            InMemoryResource::new(
                "materials",
                "material_id",
                "material_ids",
                vec![
                    json!({"material_id": "mp-13", "formula_pretty": "Fe", "task_ids": ["mp-13", "mp-1003"],
                           "structure": structure(2.87), "initial_structures": [structure(2.9), structure(2.85)],
                           "calc_types": {"mp-1003": "GGA Static", "mp-13": "GGA Structure Optimization", "mp-2001": "GGA+U Static"}}),
                    json!({"material_id": "mp-150", "formula_pretty": "Fe", "task_ids": ["mp-150"], "structure": structure(3.6)}),
                    json!({"material_id": "mp-9", "formula_pretty": "Fe", "task_ids": ["mp-9", "mp-77"], "structure": structure(2.5)}),
                    json!({"material_id": "mp-99", "formula_pretty": "Si", "task_ids": ["mp-77"], "structure": structure(5.4)}),
                ],
            ),
            InMemoryResource::new(
                "surface_properties",
                "material_id",
                "material_ids",
                vec![json!({
                    "material_id": "mp-13",
                    "surfaces": [
                        {"miller_index": [1, 0, 0], "surface_energy": 2.5, "is_reconstructed": false},
                        {"miller_index": [1, 1, 0], "surface_energy_EV_PER_ANG2": 0.15, "is_reconstructed": false},
                        {"miller_index": [1, 0, 0], "surface_energy": 2.3, "is_reconstructed": true}
                    ]
                })],
            ),
        ]
    }

    fn facade() -> (MpRester, Arc<MockTransport>) {
        let resources = backend();
        let transport = Arc::new(MockTransport::new(move |request| {
            if request.path.trim_matches('/') == HEARTBEAT_PATH {
                return json_response(200, json!({"db_version": "2021_05_13"}));
            }
            resources
                .iter()
                .find_map(|resource| resource.handle(request))
                .unwrap_or_else(|| json_response(404, json!({"detail": "Not Found"})))
        }));

        let mut settings = QuerySettings::default();
        settings.retry = settings.retry.without_delay();
        let rester =
            MpRester::with_transport(transport.clone(), Some("key".to_string()), settings).unwrap();
        (rester, transport)
    }

    #[tokio::test]
    async fn test_database_version() {
        let (rester, _) = facade();
        assert_eq!(rester.get_database_version().await.unwrap(), "2021_05_13");
    }

    #[tokio::test]
    async fn test_materials_ids_sorted_numerically() {
        let (rester, _) = facade();

        let ids = rester.get_materials_ids("Fe").await.unwrap();
        let ids: Vec<&str> = ids.iter().map(MaterialId::as_str).collect();
        assert_eq!(ids, vec!["mp-9", "mp-13", "mp-150"]);
    }

    #[tokio::test]
    async fn test_materials_id_from_task_id() {
        let (rester, _) = facade();

        assert_eq!(
            rester.get_materials_id_from_task_id("mp-1003").await.unwrap(),
            Some("mp-13".to_string())
        );
        assert_eq!(rester.get_materials_id_from_task_id("mp-4").await.unwrap(), None);
        assert!(matches!(
            rester.get_materials_id_from_task_id("mp-77").await,
            Err(ResterError::UnexpectedResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_structures() {
        let (rester, _) = facade();

        let initial = rester
            .get_structure_by_material_id("mp-13", false, false)
            .await
            .unwrap();
        assert_eq!(initial.len(), 2);

        let all_final = rester.get_structures("Fe", true).await.unwrap();
        assert_eq!(all_final.len(), 3);

        let result = rester.get_structure_by_material_id("mp-13", true, true).await;
        assert!(matches!(result, Err(ResterError::NotImplemented(_))));
    }

    #[tokio::test]
    async fn test_static_calculation_ids() {
        let (rester, _) = facade();

        let ids = rester
            .get_charge_density_calculation_ids_from_material_id("mp-13")
            .await
            .unwrap();
        assert_eq!(ids, vec!["mp-1003", "mp-2001"]);
    }

    #[tokio::test]
    async fn test_surface_data_for_equivalent_miller_index() {
        let (rester, _) = facade();
        let rester = rester.with_symmetry(Arc::new(CubicAnalyzer));

        let surface = rester
            .get_surface_data_for_miller("mp-13", &[0, 1, 0])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(surface.miller_index, vec![1, 0, 0]);
        assert_eq!(surface.surface_energy, Some(2.5));

        let missing = rester
            .get_surface_data_for_miller("mp-13", &[1, 1, 1])
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_wulff_input_prefers_reconstructed() {
        let (rester, _) = facade();
        let rester = rester.with_symmetry(Arc::new(CubicAnalyzer));

        let wulff = rester.get_wulff_shape("mp-13").await.unwrap();
        assert_eq!(wulff.lattice.matrix[0][0], 2.87);
        assert_eq!(wulff.facets.len(), 2);
        assert_eq!(wulff.facets[0], (vec![1, 0, 0], 2.3));
        assert!((wulff.facets[1].1 - 2.403_265).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_unimplemented_operations() {
        let (rester, transport) = facade();

        assert!(matches!(
            rester.get_stability(&[]).await,
            Err(ResterError::NotImplemented(_))
        ));
        assert!(matches!(
            rester.get_cohesive_energy("mp-13", true).await,
            Err(ResterError::NotImplemented(_))
        ));
        assert!(matches!(
            rester.get_phonon_dos_by_material_id("mp-13").await,
            Err(ResterError::NotImplemented(_))
        ));
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_generic_query_and_unknown_resource() {
        let (rester, _) = facade();

        let docs = rester
            .query("materials", &SearchRequest::new(Default::default()).chunk_size(2))
            .await
            .unwrap();
        assert_eq!(docs.len(), 4);

        assert!(matches!(
            rester.query("nonexistent", &SearchRequest::default()).await,
            Err(ResterError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn test_session_closed_once() {
        let (rester, transport) = facade();

        assert!(rester.close());
        assert!(!rester.close());
        assert!(matches!(
            rester.get_database_version().await,
            Err(ResterError::Closed)
        ));

        drop(rester);
        assert_eq!(transport.close_count(), 1);
    }

    #[test]
    fn test_drop_closes_session() {
        let (rester, transport) = facade();
        drop(rester);
        assert_eq!(transport.close_count(), 1);
    }
}
