use starconvex::{
    Border, Candidates, FieldView, InstanceConfig, LabelImage, NmsConfig, OverlapMeasure,
    RenderConfig, SelectConfig, StarConvexError,
};

#[test]
fn field_view_indexes_row_major_with_channels() {
    let data: Vec<f32> = (0..24).map(|v| v as f32).collect();
    let view = FieldView::new(&data, [2, 3, 2], 2).unwrap();
    assert_eq!(view.shape(), [2, 3, 2]);
    assert_eq!(view.channels(), 2);
    assert_eq!(view.len(), 12);
    assert_eq!(view.get([1, 2, 1]).unwrap(), &[22.0, 23.0]);
    assert_eq!(view.at(1).unwrap(), &[2.0, 3.0]);
    assert!(view.get([0, 3, 0]).is_none());
}

#[test]
fn field_view_ignores_trailing_data() {
    let data = [1.0f32; 10];
    let view = FieldView::scalar(&data, [2, 4]).unwrap();
    assert_eq!(view.as_slice().len(), 8);
}

#[test]
fn field_view_rejects_zero_channels() {
    let data = [0.0f32; 4];
    let err = FieldView::new(&data, [2, 2], 0).unwrap_err();
    assert_eq!(err, StarConvexError::InvalidInput("channel count must be >= 1"));
}

#[test]
fn label_image_starts_as_background() {
    let labels = LabelImage::zeros([3, 4, 5]).unwrap();
    assert_eq!(labels.shape(), [3, 4, 5]);
    assert!(labels.as_slice().iter().all(|&v| v == 0));
    assert_eq!(labels.get([2, 3, 4]), Some(0));
    assert_eq!(labels.get([3, 0, 0]), None);
    assert_eq!(labels.view().len(), 60);
}

#[test]
fn border_admits_interior_only() {
    let border = Border {
        margins: [(1, 2), (0, 0)],
    };
    assert!(!border.admits([6, 4], [0, 1]));
    assert!(border.admits([6, 4], [1, 0]));
    assert!(border.admits([6, 4], [3, 3]));
    assert!(!border.admits([6, 4], [4, 3]));
    assert!(Border::<2>::none().admits([1, 1], [0, 0]));
    assert!(!Border::<2>::uniform(1).admits([2, 2], [1, 1]));
}

#[test]
fn config_defaults() {
    let cfg = InstanceConfig::<3>::default();
    assert_eq!(cfg.select.prob_thresh, 0.5);
    assert_eq!(cfg.select.grid, [1, 1, 1]);
    assert_eq!(cfg.select.border, Border::none());
    assert_eq!(cfg.nms.nms_thresh, 0.4);
    assert_eq!(cfg.nms.measure, OverlapMeasure::Iou);
    assert_eq!(cfg.render, RenderConfig::default());
    assert!(cfg.validate().is_ok());
}

#[test]
fn config_validation_errors() {
    let nms = NmsConfig {
        nms_thresh: -0.1,
        ..NmsConfig::default()
    };
    assert_eq!(
        nms.validate(),
        Err(StarConvexError::InvalidThreshold {
            name: "nms_thresh",
            value: -0.1
        })
    );

    let nan = NmsConfig {
        nms_thresh: f32::NAN,
        ..NmsConfig::default()
    };
    assert!(matches!(
        nan.validate(),
        Err(StarConvexError::InvalidThreshold { name: "nms_thresh", .. })
    ));

    let select = SelectConfig {
        grid: [1, 0],
        ..SelectConfig::default()
    };
    assert!(matches!(
        select.validate(),
        Err(StarConvexError::InvalidGrid { .. })
    ));

    let render = RenderConfig {
        overlap_label: Some(0),
        parallel: false,
    };
    assert_eq!(
        render.validate(0),
        Err(StarConvexError::OverlapLabelCollision {
            label: 0,
            objects: 0
        })
    );
}

#[test]
fn dense_rejects_mismatched_distance_map() {
    let prob = [0.9f32; 6];
    let dist = [1.0f32; 8 * 4];
    let err = Candidates::from_dense(
        FieldView::scalar(&prob, [2, 3]).unwrap(),
        FieldView::new(&dist, [2, 4], 4).unwrap(),
        &SelectConfig::default(),
    )
    .unwrap_err();
    assert_eq!(
        err,
        StarConvexError::ShapeMismatch {
            context: "distance map",
            expected: vec![2, 3],
            got: vec![2, 4],
        }
    );
}

#[test]
fn sparse_candidates_keep_input_order() {
    let dist: Vec<f32> = (0..9).map(|v| v as f32).collect();
    let cands = Candidates::from_sparse(&[[4, 4], [1, 2], [7, 0]], &[0.3, 0.8, 0.1], &dist, 3)
        .unwrap();
    assert_eq!(cands.len(), 3);
    assert_eq!(cands.points()[1], [1, 2]);
    assert_eq!(cands.dist(2), &[6.0, 7.0, 8.0]);
    assert_eq!(cands.priority_order(), vec![1, 0, 2]);
}
