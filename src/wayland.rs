use std::time::Instant;

use log::{debug, error, info, warn};
use smithay_client_toolkit::{compositor::{CompositorHandler, CompositorState}, delegate_compositor, delegate_keyboard, delegate_layer, delegate_output, delegate_pointer, delegate_registry, delegate_seat, delegate_shm, output::{OutputHandler, OutputState}, reexports::{calloop::{generic::Generic, EventLoop, Interest, Mode, PostAction}, calloop_wayland_source::WaylandSource}, registry::{ProvidesRegistryState, RegistryState}, registry_handlers, seat::{keyboard::{KeyEvent, KeyboardHandler, Keysym, Modifiers}, pointer::{PointerEvent, PointerEventKind, PointerHandler, BTN_LEFT}, Capability, SeatHandler, SeatState}, shell::{wlr_layer::{Anchor, KeyboardInteractivity, Layer, LayerShell, LayerShellHandler, LayerSurface, LayerSurfaceConfigure}, WaylandSurface}, shm::{slot::SlotPool, Shm, ShmHandler}};
use wayland_client::{globals::registry_queue_init, protocol::{wl_keyboard::WlKeyboard, wl_output::{Transform, WlOutput}, wl_pointer::WlPointer, wl_seat::WlSeat, wl_shm, wl_surface::WlSurface}, Connection, QueueHandle};

use crate::{entry_box::EntryBox, error::StartupError, icon::ThemeIcons, input_box::{InputBox, QueryText}, launcher::{Flow, Launcher, LauncherEvent}, launcher_config::LauncherConfig, layout::{self, Rect}, registry::DesktopRegistry, render_canvas::{CanvasRenderable, RenderCanvas}, watcher::AppDirWatcher};

// used until the compositor tells us the output size
const DEFAULT_WIDTH: u32 = 1280;
const DEFAULT_HEIGHT: u32 = 720;

struct LayerState {
    registry_state: RegistryState,
    seat_state: SeatState,
    output_state: OutputState,
    shm: Shm,
    exit: bool,
    configured: bool,
    frame_pending: bool,
    dirty: bool,
    pool: SlotPool,
    width: u32,
    height: u32,
    layer: LayerSurface,
    keyboard: Option<WlKeyboard>,
    pointer: Option<WlPointer>,
    canvas: RenderCanvas,

    // App Data
    config: LauncherConfig,
    launcher: Launcher<DesktopRegistry, ThemeIcons>,
    watcher: Option<AppDirWatcher>,
    pressed: Option<usize>,

    // Components
    search_input: InputBox,
    entry_boxes: Vec<EntryBox>,
    entry_rects: Vec<Rect>
}

impl CompositorHandler for LayerState {
    fn frame(&mut self, _conn: &Connection, qh: &QueueHandle<Self>, _surface: &WlSurface, _time: u32) {
        self.frame_pending = false;
        if self.dirty {
            self.draw(qh);
        }
    }

    fn scale_factor_changed(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _surface: &WlSurface, _new_factor: i32) {}
    fn transform_changed(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _surface: &WlSurface, _new_transform: Transform) {}
    fn surface_enter(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _surface: &WlSurface, _output: &WlOutput) {}
    fn surface_leave(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _surface: &WlSurface, _output: &WlOutput) {}
}

impl OutputHandler for LayerState {
    fn output_state(&mut self) -> &mut OutputState {
        &mut self.output_state
    }

    fn new_output(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _output: WlOutput) {}
    fn update_output(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _output: WlOutput) {}
    fn output_destroyed(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _output: WlOutput) {}
}

impl LayerShellHandler for LayerState {
    fn closed(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _layer: &LayerSurface) {
        info!("Overlay closed by the compositor");
        self.exit = true;
    }

    fn configure(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _layer: &LayerSurface, configure: LayerSurfaceConfigure, _serial: u32) {
        let width = if configure.new_size.0 == 0 { DEFAULT_WIDTH } else { configure.new_size.0 };
        let height = if configure.new_size.1 == 0 { DEFAULT_HEIGHT } else { configure.new_size.1 };

        if !self.configured || (width, height) != (self.width, self.height) {
            debug!("Configured to {width}x{height}");
            self.resize(width, height);
        }
        self.configured = true;
        self.dirty = true;
    }
}

impl SeatHandler for LayerState {
    fn seat_state(&mut self) -> &mut SeatState {
        &mut self.seat_state
    }

    fn new_capability(&mut self, _conn: &Connection, qh: &QueueHandle<Self>, seat: WlSeat, capability: Capability) {
        if capability == Capability::Keyboard && self.keyboard.is_none() {
            match self.seat_state.get_keyboard(qh, &seat, None) {
                Ok(keyboard) => self.keyboard = Some(keyboard),
                Err(err) => warn!("Failed to create keyboard: {err:?}"),
            }
        }
        if capability == Capability::Pointer && self.pointer.is_none() {
            match self.seat_state.get_pointer(qh, &seat) {
                Ok(pointer) => self.pointer = Some(pointer),
                Err(err) => warn!("Failed to create pointer: {err:?}"),
            }
        }
    }

    fn remove_capability(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _seat: WlSeat, capability: Capability) {
        if capability == Capability::Keyboard {
            if let Some(keyboard) = self.keyboard.take() {
                keyboard.release();
            }
        }
        if capability == Capability::Pointer {
            if let Some(pointer) = self.pointer.take() {
                pointer.release();
            }
        }
    }

    fn new_seat(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _seat: WlSeat) {}
    fn remove_seat(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _seat: WlSeat) {}
}

impl KeyboardHandler for LayerState {
    fn press_key(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _keyboard: &WlKeyboard, _serial: u32, event: KeyEvent) {
        if self.exit {
            return;
        }
        let edited = match event.keysym {
            Keysym::Escape => return self.dispatch(LauncherEvent::SearchCancelled),
            Keysym::Return | Keysym::KP_Enter => return self.dispatch(LauncherEvent::QueryActivated),
            Keysym::BackSpace => self.search_input.edit(QueryText::pop_at_cursor),
            Keysym::Delete => self.search_input.edit(QueryText::delete_at_cursor),
            Keysym::Left => self.search_input.edit(|query| { query.reel_cursor(); false }),
            Keysym::Right => self.search_input.edit(|query| { query.advance_cursor(); false }),
            Keysym::Home => self.search_input.edit(|query| { query.cursor_home(); false }),
            Keysym::End => self.search_input.edit(|query| { query.cursor_end(); false }),
            _ => match event.utf8 {
                Some(text) => self.search_input.edit(|query| query.insert(&text)),
                None => None,
            },
        };

        if let Some(query) = edited {
            self.dispatch(LauncherEvent::QueryChanged(query));
        }
        // the cursor may have moved even when the text did not change
        self.dirty = true;
    }

    fn update_modifiers(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _keyboard: &WlKeyboard, _serial: u32, _modifiers: Modifiers, _layout: u32) {}
    fn enter(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _keyboard: &WlKeyboard, _surface: &WlSurface, _serial: u32, _raw: &[u32], _keysyms: &[Keysym]) {}
    fn leave(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _keyboard: &WlKeyboard, _surface: &WlSurface, _serial: u32) {}
    fn release_key(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _keyboard: &WlKeyboard, _serial: u32, _event: KeyEvent) {}
}

impl PointerHandler for LayerState {
    fn pointer_frame(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _pointer: &WlPointer, events: &[PointerEvent]) {
        for event in events {
            if &event.surface != self.layer.wl_surface() {
                continue;
            }
            let (x, y) = event.position;
            let hit = layout::hit_test(&self.entry_rects, x, y);

            match event.kind {
                PointerEventKind::Enter { .. } | PointerEventKind::Motion { .. } => self.set_hovered(hit),
                PointerEventKind::Leave { .. } => {
                    self.set_hovered(None);
                    self.pressed = None;
                }
                PointerEventKind::Press { button: BTN_LEFT, .. } => self.pressed = hit,
                PointerEventKind::Release { button: BTN_LEFT, .. } => {
                    let pressed = self.pressed.take();
                    if let Some(index) = hit.filter(|&index| pressed == Some(index)) {
                        self.dispatch(LauncherEvent::EntryClicked(index));
                    }
                }
                _ => {}
            }
        }
    }
}

impl ShmHandler for LayerState {
    fn shm_state(&mut self) -> &mut Shm {
        &mut self.shm
    }
}

impl ProvidesRegistryState for LayerState {
    fn registry(&mut self) -> &mut RegistryState {
        &mut self.registry_state
    }
    registry_handlers![OutputState, SeatState];
}

impl LayerState {
    pub fn draw(&mut self, qh: &QueueHandle<Self>) {
        let time = Instant::now();
        let width = self.width;
        let height = self.height;
        let stride = self.width as i32 * 4;

        let (buffer, canvas) = match self.pool.create_buffer(width as i32, height as i32, stride, wl_shm::Format::Argb8888) {
            Ok(created) => created,
            Err(err) => {
                error!("Failed to create buffer on draw: {err:?}");
                return;
            }
        };

        self.canvas.wipe(self.config.background_color);

        // Call your component draw calls here, in order you want them to display
        self.search_input.draw(&mut self.canvas);
        for entry in &mut self.entry_boxes {
            entry.draw(&mut self.canvas);
        }
        for entry in &mut self.entry_boxes {
            entry.draw_tooltip(&mut self.canvas);
        }

        // Push it to the surface
        self.canvas.fill_wayland_canvas(canvas);

        let surface = self.layer.wl_surface();
        surface.damage_buffer(0, 0, width as i32, height as i32);
        surface.frame(qh, surface.clone());
        if let Err(err) = buffer.attach_to(surface) {
            error!("Failed to attach buffer: {err:?}");
            return;
        }
        self.layer.commit();

        self.dirty = false;
        self.frame_pending = true;
        debug!("Frame drawn in {:?}", time.elapsed());
    }

    fn dispatch(&mut self, event: LauncherEvent) {
        if self.exit {
            return;
        }
        match self.launcher.handle(event) {
            Flow::Unchanged => {}
            Flow::Render => {
                debug!(
                    "{:?}: showing {} of {} applications",
                    self.launcher.state(),
                    self.launcher.visible().len(),
                    self.launcher.cache().len()
                );
                self.recreate_entry_boxes();
                self.dirty = true;
            }
            Flow::Exit => self.exit = true,
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.canvas = RenderCanvas::new(width, height);
        self.search_input.set_rect(layout::search_rect(width, height));
        self.recreate_entry_boxes();
    }

    fn recreate_entry_boxes(&mut self) {
        let time: Instant = Instant::now();
        let rects = layout::entry_rects(self.launcher.visible().len(), self.width, self.height);
        let config = &self.config;
        let surface_size = (self.width, self.height);

        self.entry_boxes = self.launcher.visible()
            .zip(&rects)
            .map(|(entry, &rect)| EntryBox::new(entry, rect, surface_size, config))
            .collect();
        self.entry_rects = rects;
        self.pressed = None;

        debug!("Time to recreate entry boxes: {:?}", time.elapsed());
    }

    fn set_hovered(&mut self, hovered: Option<usize>) {
        for (index, entry) in self.entry_boxes.iter_mut().enumerate() {
            let is_hovered = hovered == Some(index);
            if entry.hovered != is_hovered {
                entry.hovered = is_hovered;
                self.dirty = true;
            }
        }
    }
}

delegate_compositor!(LayerState);
delegate_output!(LayerState);
delegate_shm!(LayerState);
delegate_seat!(LayerState);
delegate_keyboard!(LayerState);
delegate_pointer!(LayerState);
delegate_layer!(LayerState);
delegate_registry!(LayerState);

fn start_watcher(registry: &DesktopRegistry) -> Option<AppDirWatcher> {
    match AppDirWatcher::new(registry.dirs()) {
        Ok(watcher) => Some(watcher),
        Err(err) => {
            warn!("Application changes will not be picked up: {err}");
            None
        }
    }
}

pub fn run(config: LauncherConfig) -> Result<(), StartupError> {
    let conn = Connection::connect_to_env()?;
    let (globals, event_queue) = registry_queue_init::<LayerState>(&conn)?;
    let qh = event_queue.handle();

    let mut event_loop: EventLoop<LayerState> = EventLoop::try_new()?;
    let loop_handle = event_loop.handle();
    WaylandSource::new(conn.clone(), event_queue)
        .insert(loop_handle.clone())
        .map_err(|err| err.error)?;

    let compositor = CompositorState::bind(&globals, &qh).map_err(|source| StartupError::MissingGlobal { global: "wl_compositor", source })?;
    let layer_shell = LayerShell::bind(&globals, &qh).map_err(|source| StartupError::MissingGlobal { global: "zwlr_layer_shell_v1", source })?;
    // software rendering
    let shm = Shm::bind(&globals, &qh).map_err(|source| StartupError::MissingGlobal { global: "wl_shm", source })?;

    // create our surface and layer, covering the whole output
    let surface = compositor.create_surface(&qh);
    let layer = layer_shell.create_layer_surface(&qh, surface, Layer::Overlay, Some(config.namespace.clone()), None);
    layer.set_anchor(Anchor::TOP | Anchor::BOTTOM | Anchor::LEFT | Anchor::RIGHT);
    layer.set_exclusive_zone(-1);
    layer.set_keyboard_interactivity(KeyboardInteractivity::Exclusive);
    layer.set_size(0, 0);
    layer.commit();
    let pool = SlotPool::new((DEFAULT_WIDTH * DEFAULT_HEIGHT * 4) as usize, &shm)?;

    let registry = DesktopRegistry::new();
    let mut watcher = start_watcher(&registry);
    if let Some(active) = &watcher {
        match active.poll_fd() {
            Ok(fd) => {
                loop_handle
                    .insert_source(Generic::new(fd, Interest::READ, Mode::Level), |_, _, state: &mut LayerState| {
                        if state.watcher.as_mut().is_some_and(AppDirWatcher::drain) {
                            info!("Installed applications changed");
                            state.dispatch(LauncherEvent::RegistryChanged);
                        }
                        Ok(PostAction::Continue)
                    })
                    .map_err(|err| err.error)?;
            }
            Err(err) => {
                warn!("Application changes will not be picked up: {err}");
                watcher = None;
            }
        }
    }

    let mut launcher = Launcher::new(registry, ThemeIcons::new(config.icon_theme.clone(), config.icon_size));
    launcher.populate();

    // state
    let search_rect = layout::search_rect(DEFAULT_WIDTH, DEFAULT_HEIGHT);
    let mut state = LayerState {
        registry_state: RegistryState::new(&globals),
        seat_state: SeatState::new(&globals, &qh),
        output_state: OutputState::new(&globals, &qh),
        shm,
        exit: false,
        configured: false,
        frame_pending: false,
        dirty: true,
        pool,
        layer,
        keyboard: None,
        pointer: None,
        canvas: RenderCanvas::new(DEFAULT_WIDTH, DEFAULT_HEIGHT),
        width: DEFAULT_WIDTH,
        height: DEFAULT_HEIGHT,

        launcher,
        watcher,
        pressed: None,

        search_input: InputBox::new("Search...", search_rect, config.font.clone(), config.text_color, config.field_color),
        entry_boxes: Vec::new(),
        entry_rects: Vec::new(),
        config
    };

    // event loop
    while !state.exit {
        event_loop.dispatch(None, &mut state)?;

        if state.dirty && state.configured && !state.frame_pending {
            state.draw(&qh);
        }
    }

    Ok(())
}
