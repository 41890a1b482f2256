//! The launcher itself: a sorted snapshot of launchable applications, the
//! query typed so far and the handful of entries that match it.
//!
//! Everything here runs on the event loop thread. Handlers report what the
//! surface has to do next through [`Flow`] instead of exiting on their own.

use std::{rc::Rc, time::Instant};

use log::{debug, info, warn};

use crate::{
    icon::{IconImage, IconResolver},
    registry::{AppDescriptor, AppRegistry},
};

pub const MAX_VISIBLE: usize = 8;

#[derive(Debug)]
#[allow(dead_code)]
pub struct LaunchableEntry {
    pub display_name: String,
    pub description: Option<String>,
    pub executable: Option<String>,
    pub icon_reference: String,
    pub icon: Rc<IconImage>,
    descriptor: AppDescriptor,
    // lowercased fields, in match order
    keys: [Option<String>; 3],
}
impl LaunchableEntry {
    fn new(descriptor: AppDescriptor, icon_reference: String, icon: IconImage) -> Self {
        let keys = [
            Some(descriptor.display_name.to_lowercase()),
            descriptor.description.as_deref().map(str::to_lowercase),
            descriptor.executable.as_deref().map(str::to_lowercase),
        ];
        Self {
            display_name: descriptor.display_name.clone(),
            description: descriptor.description.clone(),
            executable: descriptor.executable.clone(),
            icon_reference,
            icon: Rc::new(icon),
            descriptor,
            keys,
        }
    }

    /// `folded_query` must already be lowercase.
    pub fn matches(&self, folded_query: &str) -> bool {
        self.keys.iter().flatten().any(|key| key.contains(folded_query))
    }
}

#[derive(Debug)]
pub enum LauncherEvent {
    QueryChanged(String),
    QueryActivated,
    SearchCancelled,
    RegistryChanged,
    /// Index into the visible entries.
    EntryClicked(usize),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    /// Nothing visible changed.
    Unchanged,
    /// The visible entries were recomputed.
    Render,
    /// The launcher is done, the process should exit.
    Exit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LauncherState {
    Idle,
    Ready,
    Filtering,
    /// An entry was launched or the search was cancelled.
    Finished,
}

pub struct Launcher<R, I> {
    registry: R,
    icons: I,
    cache: Vec<LaunchableEntry>,
    query: String,
    visible: Vec<usize>,
    finished: bool,
}
impl<R: AppRegistry, I: IconResolver> Launcher<R, I> {
    pub fn new(registry: R, icons: I) -> Self {
        Self {
            registry,
            icons,
            cache: Vec::new(),
            query: String::new(),
            visible: Vec::new(),
            finished: false,
        }
    }

    pub fn state(&self) -> LauncherState {
        if self.finished {
            LauncherState::Finished
        } else if self.cache.is_empty() {
            LauncherState::Idle
        } else if self.query.is_empty() {
            LauncherState::Ready
        } else {
            LauncherState::Filtering
        }
    }

    pub fn cache(&self) -> &[LaunchableEntry] {
        &self.cache
    }

    pub fn visible(&self) -> impl ExactSizeIterator<Item = &LaunchableEntry> {
        self.visible.iter().map(|&index| &self.cache[index])
    }

    /// Once a handler returned [`Flow::Exit`] every later event is ignored
    /// and answered with `Exit` again.
    pub fn handle(&mut self, event: LauncherEvent) -> Flow {
        if self.finished {
            debug!("Ignoring {event:?}, launcher already finished");
            return Flow::Exit;
        }
        let flow = match event {
            LauncherEvent::QueryChanged(query) => self.filter(&query),
            LauncherEvent::QueryActivated => self.activate(),
            LauncherEvent::SearchCancelled => self.stop_search(),
            LauncherEvent::RegistryChanged => {
                self.populate();
                self.refilter()
            }
            LauncherEvent::EntryClicked(index) => self.click_select(index),
        };
        self.finished = flow == Flow::Exit;
        flow
    }

    /// Rebuilds the cache from the registry. Entries without categories or
    /// without a usable icon are left out.
    pub fn populate(&mut self) {
        let time = Instant::now();
        let mut descriptors: Vec<AppDescriptor> = self
            .registry
            .list_all()
            .into_iter()
            .filter(|app| !app.categories.is_empty())
            .collect();
        descriptors.sort_by_cached_key(|app| app.display_name.to_lowercase());

        let cache: Vec<LaunchableEntry> = descriptors
            .into_iter()
            .filter_map(|app| self.build_entry(app))
            .collect();

        info!("Loaded {} launchable applications in {:?}", cache.len(), time.elapsed());
        self.cache = cache;
        self.visible.clear();
    }

    fn build_entry(&self, app: AppDescriptor) -> Option<LaunchableEntry> {
        let icon_reference = app.icon.clone().unwrap_or_else(|| app.display_name.to_lowercase());
        if !self.icons.has_icon(&icon_reference) {
            debug!("Skipping '{}': no icon named '{icon_reference}'", app.display_name);
            return None;
        }
        match self.icons.resolve(&icon_reference) {
            Ok(icon) => Some(LaunchableEntry::new(app, icon_reference, icon)),
            Err(err) => {
                debug!("Skipping '{}': {err}", app.display_name);
                None
            }
        }
    }

    /// Recomputes the visible entries for `query`. An empty query shows nothing.
    pub fn filter(&mut self, query: &str) -> Flow {
        query.clone_into(&mut self.query);
        self.refilter()
    }

    fn refilter(&mut self) -> Flow {
        let time = Instant::now();
        self.visible = filter_entries(&self.cache, &self.query);
        debug!("Filtered '{}' to {} entries in {:?}", self.query, self.visible.len(), time.elapsed());
        Flow::Render
    }

    /// Launches the only visible entry. With zero or several visible entries
    /// nothing happens.
    pub fn activate(&self) -> Flow {
        match self.visible.as_slice() {
            &[index] => self.launch(index),
            _ => Flow::Unchanged,
        }
    }

    pub fn click_select(&self, visible_index: usize) -> Flow {
        match self.visible.get(visible_index) {
            Some(&index) => self.launch(index),
            None => Flow::Unchanged,
        }
    }

    pub fn stop_search(&self) -> Flow {
        Flow::Exit
    }

    fn launch(&self, index: usize) -> Flow {
        let entry = &self.cache[index];
        info!("Launching '{}'", entry.display_name);
        if let Err(err) = self.registry.launch(&entry.descriptor) {
            warn!("{err}");
        }
        Flow::Exit
    }
}

/// Indices of the first [`MAX_VISIBLE`] entries matching `query`, in cache
/// order.
pub fn filter_entries(cache: &[LaunchableEntry], query: &str) -> Vec<usize> {
    if query.is_empty() {
        return Vec::new();
    }
    let folded = query.to_lowercase();
    cache
        .iter()
        .enumerate()
        .filter(|(_, entry)| entry.matches(&folded))
        .map(|(index, _)| index)
        .take(MAX_VISIBLE)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, collections::HashSet};

    use super::*;
    use crate::error::{IconError, LaunchError};

    #[derive(Clone, Default)]
    struct FakeRegistry {
        apps: Rc<RefCell<Vec<AppDescriptor>>>,
        launched: Rc<RefCell<Vec<String>>>,
        fail_launch: bool,
    }
    impl FakeRegistry {
        fn with(apps: Vec<AppDescriptor>) -> Self {
            Self {
                apps: Rc::new(RefCell::new(apps)),
                ..Default::default()
            }
        }
    }
    impl AppRegistry for FakeRegistry {
        fn list_all(&self) -> Vec<AppDescriptor> {
            self.apps.borrow().clone()
        }

        fn launch(&self, app: &AppDescriptor) -> Result<(), LaunchError> {
            self.launched.borrow_mut().push(app.display_name.clone());
            if self.fail_launch {
                return Err(LaunchError::NoExec(app.display_name.clone()));
            }
            Ok(())
        }
    }

    /// Knows every icon except the ones listed as missing or broken.
    #[derive(Default)]
    struct FakeIcons {
        missing: HashSet<String>,
        broken: HashSet<String>,
        asked: RefCell<Vec<String>>,
    }
    impl IconResolver for FakeIcons {
        fn has_icon(&self, name: &str) -> bool {
            self.asked.borrow_mut().push(name.to_string());
            !self.missing.contains(name)
        }

        fn resolve(&self, name_or_path: &str) -> Result<IconImage, IconError> {
            if self.broken.contains(name_or_path) {
                return Err(IconError::NotFound(name_or_path.to_string()));
            }
            Ok(IconImage { width: 1, height: 1, pixels: vec![0; 4] })
        }
    }

    fn app(name: &str) -> AppDescriptor {
        AppDescriptor {
            id: format!("{}.desktop", name.to_lowercase()),
            display_name: name.to_string(),
            icon: Some(name.to_lowercase()),
            categories: vec!["Utility".to_string()],
            exec: Some(name.to_lowercase()),
            ..Default::default()
        }
    }

    fn names<R: AppRegistry, I: IconResolver>(launcher: &Launcher<R, I>) -> Vec<&str> {
        launcher.visible().map(|entry| entry.display_name.as_str()).collect()
    }

    fn cached<R: AppRegistry, I: IconResolver>(launcher: &Launcher<R, I>) -> Vec<&str> {
        launcher.cache().iter().map(|entry| entry.display_name.as_str()).collect()
    }

    fn launcher(apps: Vec<AppDescriptor>) -> (Launcher<FakeRegistry, FakeIcons>, FakeRegistry) {
        let registry = FakeRegistry::with(apps);
        let mut launcher = Launcher::new(registry.clone(), FakeIcons::default());
        launcher.populate();
        (launcher, registry)
    }

    fn sample_apps() -> Vec<AppDescriptor> {
        vec![
            AppDescriptor { description: Some("Web browser".into()), ..app("Firefox") },
            AppDescriptor { description: Some("File manager".into()), ..app("Files") },
            AppDescriptor { executable: Some("fish".into()), ..app("Fish shell") },
        ]
    }

    #[test]
    fn cache_is_sorted_case_insensitively() {
        let (launcher, _) = launcher(vec![app("zathura"), app("Alacritty"), app("btop"), app("Blender")]);
        // "blender" < "btop" under a lowercase compare, though 'B' < 'b' bytewise
        assert_eq!(cached(&launcher), vec!["Alacritty", "Blender", "btop", "zathura"]);
    }

    #[test]
    fn entries_without_categories_are_dropped() {
        let helper = AppDescriptor { categories: Vec::new(), ..app("Portal Helper") };
        let (launcher, _) = launcher(vec![app("Editor"), helper]);
        assert_eq!(cached(&launcher), vec!["Editor"]);
    }

    #[test]
    fn entries_without_a_resolvable_icon_are_dropped() {
        let registry = FakeRegistry::with(vec![app("Alpha"), app("Beta"), app("Gamma")]);
        let icons = FakeIcons {
            missing: HashSet::from(["alpha".to_string()]),
            broken: HashSet::from(["gamma".to_string()]),
            ..Default::default()
        };
        let mut launcher = Launcher::new(registry, icons);
        launcher.populate();

        assert_eq!(cached(&launcher), vec!["Beta"]);
    }

    #[test]
    fn missing_icon_reference_falls_back_to_lowercased_name() {
        let registry = FakeRegistry::with(vec![AppDescriptor { icon: None, ..app("GIMP") }]);
        let mut launcher = Launcher::new(registry, FakeIcons::default());
        launcher.populate();

        assert_eq!(launcher.cache()[0].icon_reference, "gimp");
        assert_eq!(*launcher.icons.asked.borrow(), vec!["gimp"]);
    }

    #[test]
    fn unresolvable_icon_reference_does_not_fall_back_to_the_name() {
        let registry = FakeRegistry::with(vec![AppDescriptor { icon: Some("weird-icon".into()), ..app("Thing") }]);
        let icons = FakeIcons {
            missing: HashSet::from(["weird-icon".to_string()]),
            ..Default::default()
        };
        let mut launcher = Launcher::new(registry, icons);
        launcher.populate();

        assert!(launcher.cache().is_empty());
        assert_eq!(*launcher.icons.asked.borrow(), vec!["weird-icon"]);
    }

    #[test]
    fn empty_query_shows_nothing() {
        let (mut launcher, _) = launcher(sample_apps());
        launcher.filter("fi");
        assert!(!names(&launcher).is_empty());

        assert_eq!(launcher.filter(""), Flow::Render);
        assert!(names(&launcher).is_empty());
        assert_eq!(launcher.state(), LauncherState::Ready);
    }

    #[test]
    fn query_matches_name_description_or_executable_in_cache_order() {
        let (mut launcher, _) = launcher(sample_apps());
        // "files" < "firefox" < "fish shell": 'l' < 'r' < 's' at the third char
        launcher.filter("fi");
        assert_eq!(names(&launcher), vec!["Files", "Firefox", "Fish shell"]);

        launcher.filter("BROWSER");
        assert_eq!(names(&launcher), vec!["Firefox"]);

        launcher.filter("fish");
        assert_eq!(names(&launcher), vec!["Fish shell"]);

        launcher.filter("manager");
        assert_eq!(names(&launcher), vec!["Files"]);

        launcher.filter("nothing like this");
        assert!(names(&launcher).is_empty());
    }

    #[test]
    fn absent_fields_never_match() {
        let (mut launcher, _) = launcher(vec![AppDescriptor { description: None, executable: None, ..app("Maps") }]);
        launcher.filter("none");
        assert!(names(&launcher).is_empty());
    }

    #[test]
    fn at_most_eight_entries_are_shown_and_they_are_the_first_eight() {
        let apps = (0..12).rev().map(|i| app(&format!("Tool {i:02}"))).collect();
        let (mut launcher, _) = launcher(apps);

        launcher.filter("tool");
        let expected: Vec<String> = (0..8).map(|i| format!("Tool {i:02}")).collect();
        assert_eq!(names(&launcher), expected);
    }

    #[test]
    fn enter_with_several_matches_does_nothing() {
        let (mut launcher, registry) = launcher(vec![app("Files"), app("Firefox")]);
        launcher.filter("fi");

        assert_eq!(launcher.handle(LauncherEvent::QueryActivated), Flow::Unchanged);
        assert!(registry.launched.borrow().is_empty());
        assert_eq!(names(&launcher), vec!["Files", "Firefox"]);
        assert_eq!(launcher.state(), LauncherState::Filtering);
    }

    #[test]
    fn enter_with_no_matches_does_nothing() {
        let (mut launcher, registry) = launcher(vec![app("Files")]);
        assert_eq!(launcher.handle(LauncherEvent::QueryActivated), Flow::Unchanged);
        launcher.filter("zzz");
        assert_eq!(launcher.handle(LauncherEvent::QueryActivated), Flow::Unchanged);
        assert!(registry.launched.borrow().is_empty());
    }

    #[test]
    fn enter_with_a_single_match_launches_and_exits() {
        let (mut launcher, registry) = launcher(vec![app("Files"), app("Firefox")]);
        launcher.handle(LauncherEvent::QueryChanged("fox".into()));

        assert_eq!(launcher.handle(LauncherEvent::QueryActivated), Flow::Exit);
        assert_eq!(*registry.launched.borrow(), vec!["Firefox"]);
    }

    #[test]
    fn failed_launch_still_exits() {
        let registry = FakeRegistry { fail_launch: true, ..FakeRegistry::with(vec![app("Broken")]) };
        let mut launcher = Launcher::new(registry.clone(), FakeIcons::default());
        launcher.populate();
        launcher.filter("broken");

        assert_eq!(launcher.activate(), Flow::Exit);
        assert_eq!(*registry.launched.borrow(), vec!["Broken"]);
    }

    #[test]
    fn clicking_launches_the_clicked_entry_even_among_many() {
        let (mut launcher, registry) = launcher(vec![app("Files"), app("Firefox"), app("Fish")]);
        launcher.filter("fi");

        assert_eq!(launcher.handle(LauncherEvent::EntryClicked(1)), Flow::Exit);
        assert_eq!(*registry.launched.borrow(), vec!["Firefox"]);
    }

    #[test]
    fn clicking_outside_the_visible_entries_does_nothing() {
        let (mut launcher, registry) = launcher(vec![app("Files")]);
        launcher.filter("files");

        assert_eq!(launcher.click_select(3), Flow::Unchanged);
        assert!(registry.launched.borrow().is_empty());
    }

    #[test]
    fn cancelling_exits_without_launching() {
        let (mut launcher, registry) = launcher(vec![app("Files")]);
        launcher.filter("files");

        assert_eq!(launcher.handle(LauncherEvent::SearchCancelled), Flow::Exit);
        assert!(registry.launched.borrow().is_empty());
    }

    #[test]
    fn registry_change_replaces_stale_entries() {
        let (mut launcher, registry) = launcher(vec![app("Files"), app("Firefox"), app("Fish")]);
        launcher.filter("fi");
        assert_eq!(names(&launcher).len(), 3);

        *registry.apps.borrow_mut() = vec![app("Fish")];
        assert_eq!(launcher.handle(LauncherEvent::RegistryChanged), Flow::Render);
        assert_eq!(names(&launcher), vec!["Fish"]);

        launcher.handle(LauncherEvent::QueryChanged("fi".into()));
        assert_eq!(names(&launcher), vec!["Fish"]);
        assert_eq!(cached(&launcher), vec!["Fish"]);
    }

    #[test]
    fn states_follow_cache_and_query() {
        let registry = FakeRegistry::with(vec![app("Files")]);
        let mut launcher = Launcher::new(registry.clone(), FakeIcons::default());
        assert_eq!(launcher.state(), LauncherState::Idle);

        launcher.populate();
        assert_eq!(launcher.state(), LauncherState::Ready);

        launcher.filter("f");
        assert_eq!(launcher.state(), LauncherState::Filtering);

        registry.apps.borrow_mut().clear();
        launcher.handle(LauncherEvent::RegistryChanged);
        assert_eq!(launcher.state(), LauncherState::Idle);
        assert_eq!(launcher.query, "f");
        assert!(names(&launcher).is_empty());
    }

    #[test]
    fn events_after_a_launch_are_ignored() {
        let (mut launcher, registry) = launcher(vec![app("Files"), app("Firefox")]);
        launcher.filter("files");

        assert_eq!(launcher.handle(LauncherEvent::QueryActivated), Flow::Exit);
        assert_eq!(launcher.handle(LauncherEvent::EntryClicked(0)), Flow::Exit);
        assert_eq!(launcher.handle(LauncherEvent::QueryActivated), Flow::Exit);
        assert_eq!(launcher.handle(LauncherEvent::QueryChanged("fire".into())), Flow::Exit);

        assert_eq!(*registry.launched.borrow(), vec!["Files"]);
        assert_eq!(names(&launcher), vec!["Files"]);
        assert_eq!(launcher.state(), LauncherState::Finished);
    }

    #[test]
    fn events_after_cancelling_never_launch() {
        let (mut launcher, registry) = launcher(vec![app("Files")]);
        launcher.filter("files");

        assert_eq!(launcher.handle(LauncherEvent::SearchCancelled), Flow::Exit);
        assert_eq!(launcher.handle(LauncherEvent::EntryClicked(0)), Flow::Exit);
        assert!(registry.launched.borrow().is_empty());
    }
}
