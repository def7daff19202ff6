use mandel::{gray_palette, registry, Fingerprint, MandelRenderer, RenderCache, CACHE_SIZE};
use num::Complex;
use rand::Rng;

fn random_renderer<R: Rng>(rng: &mut R) -> MandelRenderer {
    let width = rng.gen_range(1, 48);
    let height = rng.gen_range(1, 48);
    let x0 = rng.gen_range(-2.5, 1.0);
    let y0 = rng.gen_range(-1.5, 1.5);
    let x1 = x0 + rng.gen_range(-1.5, 1.5);
    let y1 = y0 + rng.gen_range(-1.5, 1.5);
    let max_iter = rng.gen_range(1, 200);
    let radius = rng.gen_range(0.5, 8.0);
    MandelRenderer::new(
        width,
        height,
        Complex::new(x0, y0),
        Complex::new(x1, y1),
        max_iter,
        radius,
    )
    .unwrap()
}

#[test]
fn histogram_invariants_hold_for_random_views() {
    let mut rng = rand::thread_rng();
    let palette = gray_palette(256, 0xff, false).unwrap();
    for _ in 0..50 {
        let img = random_renderer(&mut rng).render(palette.clone(), 3);
        let cap = img.max_iterations() as usize;
        let histo = img.histogram();
        let cn = img.cumulative_histogram();
        assert_eq!(histo.len(), cap + 1);
        assert_eq!(cn.len(), cap);
        assert!(img.pixels().iter().all(|i| *i as usize <= cap));
        assert_eq!(
            histo.iter().sum::<u64>(),
            (img.width() * img.height()) as u64
        );
        assert!(cn.windows(2).all(|w| w[0] <= w[1]));
        assert!(cn.iter().all(|v| *v >= 0.0 && *v <= 1.0));
        let escaped: u64 = histo[..cap].iter().sum();
        if escaped > 0 {
            assert_eq!(cn[cap - 1], 1.0);
        } else {
            assert!(cn.iter().all(|v| *v == 0.0));
        }
    }
}

#[test]
fn the_reference_view() {
    let img = mandel::render(
        160,
        120,
        Complex::new(-2.0, -1.2),
        Complex::new(1.0, 1.2),
        16,
        2.0,
    )
    .unwrap();
    assert_eq!(img.histogram().len(), 17);
    assert_eq!(img.cumulative_histogram().len(), 16);
    let escaped: u64 = img.histogram()[..16].iter().sum();
    assert_eq!(img.histogram()[16] + escaped, 19200);
}

#[test]
fn every_registered_palette_colors_the_same_render() {
    let palettes = registry().unwrap();
    let cache = RenderCache::new();
    let view = Fingerprint {
        width: 64,
        height: 48,
        max_iter: 32,
        x0: -2.0,
        y0: -1.2,
        x1: 1.0,
        y1: 1.2,
    };
    let first = cache
        .get_or_render(&view, 2.0, 2, &palettes.default_palette())
        .unwrap();
    for name in palettes.names() {
        let palette = palettes.get(name).unwrap();
        let img = cache.get_or_render(&view, 2.0, 2, &palette).unwrap();
        assert!(img.shares_data_with(&first), "{}", name);
        // The middle of the image is in the set.
        assert_eq!(img.iterations(43, 24), Some(32));
        assert_eq!(img.at(43, 24), palette[0], "{}", name);
    }
    assert_eq!(cache.len(), 1);
    assert!(cache.len() <= CACHE_SIZE);
}
