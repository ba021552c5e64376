use std::cell::Cell;
use std::collections::HashSet;
use std::rc::Rc;

use image::{Rgba, RgbaImage};
use layer_editor::components::tools::brush::GAP_FILL_DISTANCE;
use layer_editor::{Color, Editor, EventKind, Offset, Point, PointerButton, Rect, ToolId, ToolSettings, io};

fn layer_names(editor: &Editor) -> Vec<String> {
    editor.layers().iter().map(|l| l.name.clone()).collect()
}

fn assert_current_valid(editor: &Editor) {
    match editor.current_layer_id() {
        None => assert!(editor.layers().is_empty()),
        Some(id) => assert!(editor.layers().iter().any(|l| l.id() == id)),
    }
}

fn hard_brush(editor: &mut Editor, size: f32) {
    editor.select_tool(ToolId::Brush);
    editor.update_tool_settings(ToolSettings::new().with("size", size).with("hardness", 1.0));
}

#[test]
fn duplicate_delete_scenario() {
    let mut editor = Editor::headless();
    let first = editor.create_empty_layer();
    assert_eq!(editor.layer(first).unwrap().size(), (512, 512));
    assert_eq!(layer_names(&editor), ["Layer 1"]);

    let copy = editor.duplicate_layer(first).unwrap();
    assert_eq!(layer_names(&editor), ["Layer 1", "Layer 1 copy"]);

    editor.select_layer(first);
    editor.delete_layer(first).unwrap();
    assert_eq!(editor.current_layer_id(), Some(copy));
    assert_eq!(editor.current_layer().unwrap().name, "Layer 1 copy");

    editor.create_empty_layer();
    assert_eq!(layer_names(&editor), ["Layer 2", "Layer 1 copy"]);
}

#[test]
fn auto_names_never_reuse_freed_numbers() {
    let mut editor = Editor::headless();
    let ids: Vec<_> = (0..4).map(|_| editor.create_empty_layer_sized(2, 2)).collect();
    editor.delete_layer(ids[3]).unwrap(); // "Layer 4"
    editor.delete_layer(ids[1]).unwrap(); // "Layer 2"
    editor.create_empty_layer_sized(2, 2);
    assert_eq!(layer_names(&editor)[0], "Layer 4");

    let names: HashSet<_> = layer_names(&editor).into_iter().collect();
    assert_eq!(names.len(), editor.layers().len());
}

#[test]
fn current_layer_always_points_into_the_stack() {
    let mut editor = Editor::headless();
    assert_current_valid(&editor);
    let mut ids = Vec::new();
    for step in 0..24 {
        match step % 5 {
            0 | 1 => ids.push(editor.create_empty_layer_sized(3, 3)),
            2 => {
                if let Some(&id) = ids.get(step % ids.len().max(1)) {
                    if let Some(copy) = editor.duplicate_layer(id) {
                        ids.push(copy);
                    }
                }
            }
            _ => {
                if !ids.is_empty() {
                    let id = ids.remove(step % ids.len());
                    let before: Vec<_> = editor.layers().iter().map(|l| l.id()).collect();
                    let was_current = editor.current_layer_id() == Some(id);
                    editor.delete_layer(id).unwrap();
                    if was_current {
                        let index = before.iter().position(|&l| l == id).unwrap();
                        let expected = if index == 0 { before.get(1) } else { before.get(index - 1) };
                        assert_eq!(editor.current_layer_id(), expected.copied());
                    }
                }
            }
        }
        assert_current_valid(&editor);
        assert_eq!(editor.compositor().texture_count(), editor.layers().len());
    }
    while let Some(id) = ids.pop() {
        editor.delete_layer(id).unwrap();
        assert_current_valid(&editor);
    }
    assert!(editor.current_layer().is_none());
    assert_eq!(editor.compositor().texture_count(), 0);
}

#[test]
fn deleting_the_current_middle_layer_selects_the_one_above() {
    let mut editor = Editor::headless();
    editor.create_empty_layer_sized(2, 2);
    let middle = editor.create_empty_layer_sized(2, 2);
    let top = editor.create_empty_layer_sized(2, 2);
    editor.select_layer(middle);
    editor.delete_layer(middle).unwrap();
    assert_eq!(editor.current_layer_id(), Some(top));
    assert_eq!(editor.current_layer().unwrap().name, "Layer 3");
}

#[test]
fn deleting_twice_is_a_no_op() {
    let mut editor = Editor::headless();
    let id = editor.create_empty_layer_sized(4, 4);
    let texture = editor.layer(id).unwrap().texture();
    assert!(editor.delete_layer(id).unwrap());
    assert!(!editor.compositor().is_registered(texture));
    assert!(!editor.delete_layer(id).unwrap());
}

#[test]
fn selection_drag_direction_does_not_matter() {
    let drag = |a: Point, b: Point| {
        let mut editor = Editor::headless();
        editor.select_tool(ToolId::Select);
        editor.pointer_down(a, PointerButton::Left);
        editor.pointer_move(b);
        editor.pointer_up(b);
        (editor.selection().offset(), editor.selection().size())
    };
    let a = Point::new(300.0, 300.0);
    let b = Point::new(100.0, 100.0);
    assert_eq!(drag(a, b), (Offset::new(99, 99), (202, 202)));
    assert_eq!(drag(a, b), drag(b, a));
    assert_eq!(
        drag(Point::new(5.0, 40.0), Point::new(30.0, 2.0)),
        drag(Point::new(30.0, 2.0), Point::new(5.0, 40.0))
    );
}

#[test]
fn selection_survives_tool_switches() {
    let mut editor = Editor::headless();
    editor.select_tool(ToolId::Select);
    editor.pointer_down(Point::new(1.0, 1.0), PointerButton::Left);
    editor.pointer_move(Point::new(11.0, 6.0));
    editor.pointer_up(Point::new(11.0, 6.0));
    editor.select_tool(ToolId::Brush);
    assert_eq!(editor.selection().rect(), Rect::new(0, 0, 12, 7));
}

#[test]
fn size_one_stroke_covers_every_pixel() {
    let mut editor = Editor::headless();
    let id = editor.create_empty_layer_sized(16, 4);
    editor.set_foreground(Color::rgb(255, 0, 0));
    hard_brush(&mut editor, 1.0);

    editor.pointer_down(Point::new(0.0, 0.0), PointerButton::Left);
    editor.pointer_move(Point::new(10.0, 0.0));
    editor.pointer_up(Point::new(10.0, 0.0));

    let pixels = editor.layer_pixels(id).unwrap();
    for x in 0..=10 {
        assert_eq!(*pixels.get_pixel(x, 0), Rgba([255, 0, 0, 255]), "x = {x}");
    }
    assert_eq!(pixels.get_pixel(11, 0)[3], 0);
    assert!((0..16).all(|x| pixels.get_pixel(x, 1)[3] == 0));
}

#[test]
fn fast_strokes_leave_no_gaps() {
    let mut editor = Editor::headless();
    let id = editor.create_empty_layer_sized(64, 64);
    hard_brush(&mut editor, 1.0);

    let path = [(2.0, 3.0), (40.0, 17.0), (12.0, 60.0), (61.0, 61.0)];
    editor.pointer_down(Point::new(path[0].0, path[0].1), PointerButton::Left);
    for &(x, y) in &path[1..] {
        assert!(Point::new(x, y).distance_to(Point::new(2.0, 3.0)) > GAP_FILL_DISTANCE);
        editor.pointer_move(Point::new(x, y));
    }
    editor.pointer_up(Point::new(61.0, 61.0));

    // Every painted pixel reaches the start through 8-connected painted pixels.
    let pixels = editor.layer_pixels(id).unwrap();
    let painted: HashSet<(i32, i32)> = pixels
        .enumerate_pixels()
        .filter(|(_, _, p)| p[3] > 0)
        .map(|(x, y, _)| (x as i32, y as i32))
        .collect();
    let mut seen = HashSet::from([(2, 3)]);
    let mut stack = vec![(2, 3)];
    while let Some((x, y)) = stack.pop() {
        for dx in -1..=1 {
            for dy in -1..=1 {
                let n = (x + dx, y + dy);
                if painted.contains(&n) && seen.insert(n) {
                    stack.push(n);
                }
            }
        }
    }
    assert_eq!(seen.len(), painted.len());
    for (x, y) in path {
        assert!(painted.contains(&(x as i32, y as i32)));
    }
}

#[test]
fn eraser_clears_to_transparent() {
    let mut editor = Editor::headless();
    let id = editor.create_layer_from_image(RgbaImage::from_pixel(8, 8, Rgba([0, 200, 0, 255])));
    editor.select_tool(ToolId::Eraser);
    editor.update_tool_settings(ToolSettings::new().with("size", 1.0).with("hardness", 1.0));
    editor.pointer_down(Point::new(1.0, 4.0), PointerButton::Left);
    editor.pointer_move(Point::new(6.0, 4.0));
    editor.pointer_up(Point::new(6.0, 4.0));

    let pixels = editor.layer_pixels(id).unwrap();
    assert!((1..=6).all(|x| pixels.get_pixel(x, 4)[3] == 0));
    assert_eq!(pixels.get_pixel(0, 4)[3], 255);
    assert_eq!(pixels.get_pixel(7, 4)[3], 255);
}

#[test]
fn brush_without_layers_is_harmless() {
    let mut editor = Editor::headless();
    hard_brush(&mut editor, 5.0);
    editor.pointer_down(Point::new(1.0, 1.0), PointerButton::Left);
    editor.pointer_move(Point::new(9.0, 9.0));
    editor.pointer_up(Point::new(9.0, 9.0));
    assert!(editor.layers().is_empty());
}

#[test]
fn render_region_has_exact_dimensions() {
    let mut editor = Editor::headless();
    let id = editor.create_layer_from_image(RgbaImage::from_pixel(20, 10, Rgba([10, 20, 30, 255])));
    editor.move_layer(id, Offset::new(-5, 3));

    for rect in [
        Rect::new(0, 0, 1, 1),
        Rect::new(-100, -100, 37, 19),
        Rect::new(0, 0, 0, 9),
        Rect::new(3, 3, 512, 512),
    ] {
        let img = editor.render_region(rect).unwrap();
        assert_eq!(img.dimensions(), (rect.width, rect.height));
    }

    let img = editor.render_region(Rect::new(-5, 3, 20, 10)).unwrap();
    assert!(img.pixels().all(|p| *p == Rgba([10, 20, 30, 255])));
}

#[test]
fn layers_composite_bottom_to_top() {
    let mut editor = Editor::headless();
    editor.create_layer_from_image(RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 255])));
    let top = editor.create_layer_from_image(RgbaImage::from_pixel(2, 2, Rgba([0, 0, 255, 255])));
    editor.move_layer(top, Offset::new(2, 2));

    let img = editor.export_whole_document_image().unwrap();
    assert_eq!(img.dimensions(), (4, 4));
    assert_eq!(*img.get_pixel(0, 0), Rgba([255, 0, 0, 255]));
    assert_eq!(*img.get_pixel(3, 3), Rgba([0, 0, 255, 255]));
}

#[test]
fn export_selection_falls_back_to_current_layer() {
    let mut editor = Editor::headless();
    let mut src = RgbaImage::new(6, 5);
    src.put_pixel(1, 2, Rgba([9, 9, 9, 128]));
    let id = editor.create_layer_from_image(src.clone());
    editor.move_layer(id, Offset::new(30, 40));

    let uri = editor.export_selection().unwrap();
    assert!(uri.starts_with("data:image/png;base64,"));
    assert_eq!(io::decode_data_uri(&uri).unwrap(), src);

    editor.set_selection(Point::new(31.0, 42.0), Point::new(33.0, 44.0));
    let img = io::decode_data_uri(&editor.export_selection().unwrap()).unwrap();
    assert_eq!(img.dimensions(), (4, 4));
    assert_eq!(*img.get_pixel(1, 1), Rgba([9, 9, 9, 128]));
}

#[test]
fn loaded_layers_take_the_image_size() {
    let mut editor = Editor::headless();
    let png = io::encode_png(&RgbaImage::from_pixel(7, 3, Rgba([1, 2, 3, 4]))).unwrap();
    let id = editor.load_layer_from_bytes(&png).unwrap();
    assert_eq!(editor.layer(id).unwrap().size(), (7, 3));

    let uri = io::to_data_uri(&RgbaImage::new(2, 9)).unwrap();
    let id = editor.load_layer_from_url(&uri).unwrap();
    assert_eq!(editor.current_layer_id(), Some(id));
    assert_eq!(editor.layer(id).unwrap().size(), (2, 9));

    assert!(editor.load_layer_from_bytes(b"\x89PNG broken").is_err());
    assert_eq!(editor.layers().len(), 2);
}

#[test]
fn fill_and_eyedropper_round_trip() {
    let mut editor = Editor::headless();
    editor.create_empty_layer_sized(10, 10);
    editor.set_foreground_color("#336699").unwrap();
    editor.select_tool(ToolId::Fill);
    editor.pointer_down(Point::new(4.0, 4.0), PointerButton::Left);
    editor.pointer_up(Point::new(4.0, 4.0));

    editor.set_foreground(Color::BLACK);
    editor.select_tool(ToolId::Eyedropper);
    editor.pointer_down(Point::new(7.0, 2.0), PointerButton::Right);
    editor.pointer_up(Point::new(7.0, 2.0));
    assert_eq!(editor.foreground().to_hex(), "#336699");
}

#[test]
fn listeners_fire_in_subscription_order_until_unsubscribed() {
    let mut editor = Editor::headless();
    let order = Rc::new(Cell::new(0u32));
    let (a, b) = (Rc::clone(&order), Rc::clone(&order));
    let first = editor.subscribe(EventKind::State, move |_| a.set(a.get() * 10 + 1));
    editor.subscribe(EventKind::State, move |_| b.set(b.get() * 10 + 2));

    editor.create_empty_layer_sized(1, 1);
    assert_eq!(order.get(), 12);

    assert!(editor.unsubscribe(first));
    order.set(0);
    editor.create_empty_layer_sized(1, 1);
    assert_eq!(order.get(), 2);
}

#[test]
fn frame_draws_overlays_at_surface_size() {
    let mut editor = Editor::headless();
    editor.set_surface_size(64, 48);
    editor.create_layer_from_image(RgbaImage::from_pixel(8, 8, Rgba([0, 255, 0, 255])));
    editor.set_selection(Point::new(20.0, 20.0), Point::new(40.0, 30.0));
    editor.draw_frame().unwrap();

    let frame = editor.read_frame().unwrap();
    assert_eq!(frame.dimensions(), (64, 48));
    // Inside the layer, away from its bounds highlight.
    assert_eq!(*frame.get_pixel(4, 4), Rgba([0, 255, 0, 255]));
    // Transparent regions show the checkerboard.
    assert_eq!(frame.get_pixel(50, 5)[3], 255);
}
