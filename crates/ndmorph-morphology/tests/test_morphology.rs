use ndmorph_image::{ops, BoundaryCondition, Image};
use ndmorph_morphology::{
    closing, dilation, erosion, opening, parallel::ExecutionStrategy,
    pixel_table::pixel_table_morphology, tophat, EdgeType, Kernel, MorphologyError, Polarity,
    SeShape, StructuringElement, TophatPolarity,
};
use rand::Rng;

/// A random image whose outer `margin` pixels are zero.
fn padded_random(sizes: &[usize], margin: usize) -> Image<u8> {
    let mut rng = rand::rng();
    let mut image = Image::from_size_val(sizes, 0u8);
    for i in 0..image.num_pixels() {
        let coords = image.coords(i);
        let inside = coords
            .iter()
            .zip(sizes)
            .all(|(&c, &s)| c >= margin && c + margin < s);
        if inside {
            image.as_slice_mut()[i] = rng.random_range(0..=255);
        }
    }
    image
}

fn shapes() -> Vec<StructuringElement> {
    let pattern = [1, 0, 1, 1, 1, 0, 0, 1, 1, 1, 0, 1];
    let mask = Image::new(&[3, 4], pattern.iter().map(|&v| v == 1).collect()).unwrap();
    vec![
        StructuringElement::new(vec![9.0, 5.0], SeShape::Rectangular),
        StructuringElement::new(vec![9.0], SeShape::Elliptic),
        StructuringElement::new(vec![9.0], SeShape::Diamond),
        StructuringElement::new(vec![9.0], SeShape::Octagonal),
        StructuringElement::new(vec![9.0, 4.0], SeShape::DiscreteLine),
        StructuringElement::new(vec![9.0, -4.0], SeShape::FastLine),
        StructuringElement::new(vec![8.0, 4.0], SeShape::PeriodicLine),
        StructuringElement::new(vec![9.0, 4.0], SeShape::InterpolatedLine),
        StructuringElement::from_mask(&mask),
    ]
}

fn all_le(a: &Image<u8>, b: &Image<u8>) -> bool {
    a.as_slice().iter().zip(b.as_slice()).all(|(x, y)| x <= y)
}

#[test]
fn test_opening_closing_are_idempotent() -> Result<(), MorphologyError> {
    // RUST_LOG=debug cargo test -p ndmorph-morphology -- --nocapture
    let _ = env_logger::builder().is_test(true).try_init();
    let image = padded_random(&[40, 36], 8);
    // interpolated lines resample the image and are only approximately idempotent
    let exact = shapes()
        .into_iter()
        .filter(|se| se.shape() != &SeShape::InterpolatedLine);
    for se in exact {
        let opened = opening(&image, &se, &[])?;
        assert!(all_le(&opened, &image), "{} opening is not anti-extensive", se.shape());
        assert_eq!(opening(&opened, &se, &[])?, opened, "{}", se.shape());

        let closed = closing(&image, &se, &[])?;
        assert!(all_le(&image, &closed), "{} closing is not extensive", se.shape());
        assert_eq!(closing(&closed, &se, &[])?, closed, "{}", se.shape());
    }
    Ok(())
}

#[test]
fn test_dilation_erosion_duality() -> Result<(), MorphologyError> {
    let image = padded_random(&[33, 29], 0);
    let inverted = ops::invert(&image);
    for se in shapes() {
        let dilated = dilation(&image, &se, &[])?;
        let dual = ops::invert(&erosion(&inverted, &se, &[])?);
        assert_eq!(dilated, dual, "{}", se.shape());
    }
    Ok(())
}

#[test]
fn test_dilation_is_monotone() -> Result<(), MorphologyError> {
    let f = padded_random(&[30, 30], 0);
    let g = ops::supremum(&f, &padded_random(&[30, 30], 0))?;
    for se in shapes() {
        for bcs in [vec![], vec![BoundaryCondition::SymmetricMirror]] {
            assert!(all_le(&dilation(&f, &se, &bcs)?, &dilation(&g, &se, &bcs)?));
            assert!(all_le(&erosion(&f, &se, &bcs)?, &erosion(&g, &se, &bcs)?));
        }
    }
    Ok(())
}

#[test]
fn test_uniform_image_is_unchanged() -> Result<(), MorphologyError> {
    let image = Image::from_size_val(&[12, 9, 5], 77u16);
    for shape in ["rectangular", "elliptic", "diamond", "octagonal", "parabolic", "line"] {
        let se = StructuringElement::from_name(vec![5.0], shape)?;
        assert_eq!(opening(&image, &se, &[])?, image, "{shape}");
        assert_eq!(closing(&image, &se, &[])?, image, "{shape}");
    }
    Ok(())
}

#[test]
fn test_rectangular_impulse_response() -> Result<(), MorphologyError> {
    let mut image = Image::from_size_val(&[64, 41], 0u8);
    if let Some(v) = image.get_mut(&[32, 20]) {
        *v = 9;
    }
    let se = StructuringElement::new(vec![4.0, 3.0], SeShape::Rectangular);
    let out = dilation(&image, &se, &[])?;
    let set = (0..out.num_pixels())
        .filter(|&i| out.as_slice()[i] == 9)
        .map(|i| out.coords(i))
        .collect::<Vec<_>>();
    assert_eq!(set.len(), 12);
    // an even window reaches one pixel further back, so its dilation extends forward
    assert!(set.iter().all(|c| (31..=34).contains(&c[0]) && (19..=21).contains(&c[1])));
    Ok(())
}

#[test]
fn test_white_tophat_plus_opening() -> Result<(), MorphologyError> {
    let image = padded_random(&[25, 25], 3);
    let se = StructuringElement::new(vec![5.0], SeShape::Elliptic);
    let residue = tophat(&image, &se, EdgeType::Texture, TophatPolarity::White, &[])?;
    let opened = opening(&image, &se, &[])?;
    assert_eq!(ops::add(&opened, &residue)?, image);
    Ok(())
}

#[test]
fn test_rectangle_is_separable() -> Result<(), MorphologyError> {
    let mut rng = rand::rng();
    let data = (0..23 * 19).map(|_| rng.random_range(0..=255u8)).collect();
    let image = Image::new(&[23, 19], data)?;
    let rect = |a: usize, b: usize| {
        StructuringElement::new(vec![a as f64, b as f64], SeShape::Rectangular)
    };
    let pairs = [(1, 1), (1, 4), (4, 1), (2, 3), (3, 2), (4, 6), (5, 4), (7, 7)];
    for bcs in [vec![], vec![BoundaryCondition::SymmetricMirror]] {
        for (a, b) in pairs {
            let full = dilation(&image, &rect(a, b), &bcs)?;
            let x_then_y = dilation(&dilation(&image, &rect(a, 1), &bcs)?, &rect(1, b), &bcs)?;
            let y_then_x = dilation(&dilation(&image, &rect(1, b), &bcs)?, &rect(a, 1), &bcs)?;
            assert_eq!(full, x_then_y, "{a}x{b} {bcs:?}");
            assert_eq!(full, y_then_x, "{a}x{b} {bcs:?}");

            let table = pixel_table_morphology(
                &image,
                &Kernel::rectangular(&[a as f64, b as f64]),
                Polarity::Dilation,
                &bcs,
                ExecutionStrategy::Serial,
            )?;
            assert_eq!(full, table, "{a}x{b} {bcs:?}");
        }
    }
    Ok(())
}
