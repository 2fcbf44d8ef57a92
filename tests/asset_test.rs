use fell_ngin::{
    Point3, data_structures::bounds::BoundingBox, resources::texture::load_string,
};

fn load_tree_obj() -> Vec<tobj::Model> {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    runtime.block_on(async {
        let text = load_string("models/tree.obj").await.unwrap();
        let (models, _) = tobj::load_obj_buf_async(
            &mut std::io::BufReader::new(std::io::Cursor::new(text)),
            &tobj::LoadOptions {
                triangulate: true,
                single_index: true,
                ..Default::default()
            },
            |_| async { Err(tobj::LoadError::OpenFileFailed) },
        )
        .await
        .unwrap();
        models
    })
}

#[test]
fn shipped_tree_has_a_trunk_and_a_canopy() {
    let models = load_tree_obj();
    assert_eq!(models.len(), 2);
    assert!(models.iter().all(|m| !m.mesh.indices.is_empty()));
}

#[test]
fn shipped_tree_fits_the_unit_tree_box() {
    let bounds = BoundingBox::for_tree(Point3::new(0.0, 0.0, 0.0), 1.0);
    for model in load_tree_obj() {
        for p in model.mesh.positions.chunks_exact(3) {
            let vertex = Point3::new(p[0], p[1], p[2]);
            assert!(bounds.contains(vertex), "{} vertex {:?} outside {:?}", model.name, vertex, bounds);
        }
    }
}
